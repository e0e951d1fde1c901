use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::params;

use crate::errors::Result;
use crate::errors::StoreError;

const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

/// Latest balance snapshot of one coin
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceRow {
    pub coin: String,
    pub balance: f64,
    pub usd_price: Option<f64>,
    pub btc_price: Option<f64>,
    pub datetime: String,
}

impl BalanceRow {
    pub fn usd_value(&self) -> Option<f64> {
        self.usd_price.map(|price| price * self.balance)
    }

    pub fn btc_value(&self) -> Option<f64> {
        self.btc_price.map(|price| price * self.balance)
    }
}

/// One completed buy, with the change relative to the previous time the same coin was bought
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRow {
    pub coin: String,
    pub amount: f64,
    pub change_pct: Option<f64>,
    pub datetime: String,
}

/// Latest scout result for a pair starting at the current coin
#[derive(Debug, Clone, PartialEq)]
pub struct RatioRow {
    pub coin: String,
    pub target_ratio: Option<f64>,
    pub current_coin_price: Option<f64>,
    pub other_coin_price: Option<f64>,
    pub datetime: String,
}

impl RatioRow {
    /// Price ratio current coin / other coin
    pub fn current_ratio(&self) -> Option<f64> {
        match (self.current_coin_price, self.other_coin_price) {
            (Some(current), Some(other)) if other != 0.0 => Some(current / other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeRow {
    pub alt_coin: String,
    pub crypto_coin: String,
    pub selling: bool,
    pub state: String,
    pub alt_amount: Option<f64>,
    pub crypto_amount: Option<f64>,
    pub datetime: String,
}

/// Read-only view of the trading bot database.
///
/// A connection is opened per query so a database that appears, disappears, or is replaced between
/// queries is always seen in its current state.
#[derive(Debug, Clone)]
pub struct TradeDb {
    path: PathBuf,
}

impl TradeDb {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn connect(&self) -> Result<Connection> {
        if !self.exists() {
            return Err(StoreError::Missing(self.path.clone()));
        }
        let conn = Connection::open_with_flags(&self.path, OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    /// Coin the bot currently holds
    pub fn current_coin(&self) -> Result<Option<String>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT coin_id FROM current_coin_history ORDER BY id DESC LIMIT 1")?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Latest snapshot of every coin with a positive balance
    pub fn balances(&self) -> Result<Vec<BalanceRow>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT cv.coin_id, cv.balance, cv.usd_price, cv.btc_price, cv.datetime FROM coin_value cv \
             JOIN (SELECT coin_id, MAX(id) AS id FROM coin_value GROUP BY coin_id) latest ON latest.id = cv.id \
             WHERE cv.balance > 0 ORDER BY cv.coin_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(BalanceRow { coin: row.get(0)?, balance: row.get(1)?, usd_price: row.get(2)?, btc_price: row.get(3)?, datetime: row.get(4)? })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Most recent `limit` completed buys, newest first
    pub fn progress(&self, limit: usize) -> Result<Vec<ProgressRow>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT alt_coin_id, alt_trade_amount, datetime FROM trade_history \
             WHERE selling = 0 AND state = 'COMPLETE' AND alt_trade_amount IS NOT NULL ORDER BY id",
        )?;
        let buys = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?, row.get::<_, String>(2)?)))?;

        let mut last_amount: HashMap<String, f64> = HashMap::new();
        let mut progress = Vec::new();
        for buy in buys {
            let (coin, amount, datetime) = buy?;
            let change_pct = last_amount.get(&coin).filter(|&&previous| previous != 0.0).map(|previous| (amount - previous) / previous * 100.0);
            last_amount.insert(coin.clone(), amount);
            progress.push(ProgressRow { coin, amount, change_pct, datetime });
        }

        progress.reverse();
        progress.truncate(limit);
        Ok(progress)
    }

    /// Latest scout result for every pair leaving `coin`
    pub fn ratios(&self, coin: &str) -> Result<Vec<RatioRow>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT p.to_coin_id, sh.target_ratio, sh.current_coin_price, sh.other_coin_price, sh.datetime \
             FROM scout_history sh JOIN pairs p ON p.id = sh.pair_id \
             JOIN (SELECT pair_id, MAX(id) AS id FROM scout_history GROUP BY pair_id) latest ON latest.id = sh.id \
             WHERE p.from_coin_id = ?1 ORDER BY p.to_coin_id",
        )?;
        let rows = stmt.query_map(params![coin], |row| {
            Ok(RatioRow {
                coin: row.get(0)?,
                target_ratio: row.get(1)?,
                current_coin_price: row.get(2)?,
                other_coin_price: row.get(3)?,
                datetime: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Most recent `limit` trades, newest first
    pub fn trade_history(&self, limit: usize) -> Result<Vec<TradeRow>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT alt_coin_id, crypto_coin_id, selling, state, alt_trade_amount, crypto_trade_amount, datetime \
             FROM trade_history ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(TradeRow {
                alt_coin: row.get(0)?,
                crypto_coin: row.get(1)?,
                selling: row.get(2)?,
                state: row.get(3)?,
                alt_amount: row.get(4)?,
                crypto_amount: row.get(5)?,
                datetime: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
