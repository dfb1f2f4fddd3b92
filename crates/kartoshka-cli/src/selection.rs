//! Parsing playlist selections such as `1,3-5`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Selection is empty")]
    Empty,

    #[error("Invalid selection entry '{0}'")]
    Invalid(String),

    #[error("Entry {index} is out of range (playlist has {len} videos)")]
    OutOfRange { index: usize, len: usize },
}

fn position(token: &str, len: usize) -> Result<usize, SelectionError> {
    let index: usize = token
        .trim()
        .parse()
        .map_err(|_| SelectionError::Invalid(token.trim().to_string()))?;
    if index == 0 || index > len {
        return Err(SelectionError::OutOfRange { index, len });
    }
    Ok(index - 1)
}

/// Parse 1-based entries and inclusive ranges into zero-based indices.
///
/// Duplicates are dropped and the first occurrence keeps its place.
pub fn parse_selection(spec: &str, len: usize) -> Result<Vec<usize>, SelectionError> {
    let mut indices = Vec::new();

    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let range = match part.split_once('-') {
            Some((start, end)) => {
                let (start, end) = (position(start, len)?, position(end, len)?);
                if start > end {
                    return Err(SelectionError::Invalid(part.to_string()));
                }
                start..=end
            }
            None => {
                let single = position(part, len)?;
                single..=single
            }
        };

        for index in range {
            if !indices.contains(&index) {
                indices.push(index);
            }
        }
    }

    if indices.is_empty() {
        return Err(SelectionError::Empty);
    }
    Ok(indices)
}
