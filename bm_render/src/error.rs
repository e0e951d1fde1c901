use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Fragment of {len} chars does not fit a message budget of {budget} chars")]
    FragmentTooLong { len: usize, budget: usize },

    #[error("Column {column} width {width} is below the minimum of {min}")]
    WidthTooSmall { column: usize, width: usize, min: usize },

    #[error("Layout describes {layout} columns but {data} were supplied")]
    ColumnMismatch { layout: usize, data: usize },

    #[error("Padding ({pad} chars) leaves no room in a {max_len} char message")]
    PaddingTooLong { pad: usize, max_len: usize },
}

pub type Result<T> = std::result::Result<T, RenderError>;
