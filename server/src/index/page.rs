use std::convert::Infallible;

use serde::Serialize;

use crate::utils::error::AppError;

/// Hard ceiling applied when no explicit maximum is configured.
pub const DEFAULT_MAX_LIMIT: usize = 200;

/// Resolves a raw `limit` query value.
///
/// Absent, blank or zero falls back to `default`; values above `max` are
/// clamped; non-numeric or negative values are rejected.
pub fn parse_limit(raw: Option<&str>, default: usize, max: usize) -> Result<usize, AppError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(default.min(max)),
        Some(raw) => raw,
    };

    match raw.parse::<i64>() {
        Ok(n) if n < 0 => Err(AppError::InvalidLimit(format!(
            "limit must not be negative, got {n}"
        ))),
        Ok(0) => Ok(default.min(max)),
        Ok(n) => Ok(usize::try_from(n).unwrap_or(max).min(max)),
        // Digits that overflow i64 are just a very large limit.
        Err(_) if raw.bytes().all(|b| b.is_ascii_digit()) => Ok(max),
        Err(_) => Err(AppError::InvalidLimit(format!(
            "limit must be a positive integer, got '{raw}'"
        ))),
    }
}

/// Lenient boolean query flag. Unrecognised values leave the flag unset.
pub fn parse_flag(raw: Option<&str>) -> Option<bool> {
    match raw?.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// How many rows a listing should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    Limited(usize),
    /// `all=true`: no pagination, bounded by the export safety cap.
    All { cap: usize },
}

impl PageSize {
    pub fn rows(&self) -> usize {
        match *self {
            PageSize::Limited(n) => n,
            PageSize::All { cap } => cap,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T: Serialize> {
    pub results: Vec<T>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
    pub total_count: Option<i64>,
}

impl<T: Serialize> Page<T> {
    /// Builds a page from rows fetched with one extra row of look-ahead.
    ///
    /// `cursor_of` encodes the resume position of the last kept row.
    pub fn from_lookahead<R, F, M>(
        rows: Vec<R>,
        size: usize,
        total_count: Option<i64>,
        cursor_of: F,
        mut into_item: M,
    ) -> Self
    where
        F: Fn(&R) -> String,
        M: FnMut(R) -> T,
    {
        Self::try_from_lookahead(rows, size, total_count, cursor_of, |row| {
            Ok::<T, Infallible>(into_item(row))
        })
        .unwrap_or_else(|never| match never {})
    }

    /// Like [`Page::from_lookahead`], but any row that fails to convert fails
    /// the whole page. A page never silently drops rows.
    pub fn try_from_lookahead<R, F, M, E>(
        mut rows: Vec<R>,
        size: usize,
        total_count: Option<i64>,
        cursor_of: F,
        into_item: M,
    ) -> Result<Self, E>
    where
        F: Fn(&R) -> String,
        M: FnMut(R) -> Result<T, E>,
    {
        let has_more = rows.len() > size;
        rows.truncate(size);

        let next_cursor = if has_more {
            rows.last().map(&cursor_of)
        } else {
            None
        };

        Ok(Self {
            results: rows.into_iter().map(into_item).collect::<Result<_, E>>()?,
            next_cursor,
            has_more,
            total_count,
        })
    }
}
