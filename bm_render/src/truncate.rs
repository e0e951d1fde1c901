use crate::error::RenderError;
use crate::error::Result;

/// Greedily pack fragments into messages of at most `max_len` chars.
///
/// Every message starts with `head_pad` and ends with `tail_pad`. Fragments are never split; a
/// fragment that cannot fit a message on its own (`max_len - head_pad - tail_pad`) is rejected.
/// Callers keep fragments short, e.g. one paragraph or one table from [`crate::tabularize`].
pub fn truncate_to_messages<S: AsRef<str>>(fragments: &[S], max_len: usize, head_pad: &str, tail_pad: &str) -> Result<Vec<String>> {
    let head_len = head_pad.chars().count();
    let tail_len = tail_pad.chars().count();
    let pad = head_len + tail_len;
    if pad >= max_len {
        return Err(RenderError::PaddingTooLong { pad, max_len });
    }
    let budget = max_len - pad;

    let mut messages = Vec::new();
    let mut current = String::from(head_pad);
    let mut current_len = 0;

    for fragment in fragments {
        let fragment = fragment.as_ref();
        let len = fragment.chars().count();
        if len > budget {
            return Err(RenderError::FragmentTooLong { len, budget });
        }
        if current_len + len > budget {
            current.push_str(tail_pad);
            messages.push(std::mem::replace(&mut current, String::from(head_pad)));
            current_len = 0;
        }
        current.push_str(fragment);
        current_len += len;
    }

    if current_len > 0 {
        current.push_str(tail_pad);
        messages.push(current);
    }

    Ok(messages)
}
