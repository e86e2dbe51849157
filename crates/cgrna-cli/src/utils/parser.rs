use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Chain list '{0}' is empty. Expected comma-separated chain ids (e.g., 'A,B').")]
    EmptyChainList(String),

    #[error("Chain list '{list}' contains an empty chain id at position {position}.")]
    EmptyChainId { list: String, position: usize },
}

/// Splits a comma-separated chain list such as `A,B,10`. Whitespace around
/// ids is ignored; ids themselves are kept verbatim.
pub fn parse_chain_list(list: &str) -> Result<Vec<String>, ParseError> {
    if list.trim().is_empty() {
        return Err(ParseError::EmptyChainList(list.to_string()));
    }
    list.split(',')
        .enumerate()
        .map(|(i, id)| {
            let id = id.trim();
            if id.is_empty() {
                Err(ParseError::EmptyChainId {
                    list: list.to_string(),
                    position: i + 1,
                })
            } else {
                Ok(id.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_trims_chain_ids() {
        assert_eq!(parse_chain_list("A, B ,10").unwrap(), vec!["A", "B", "10"]);
        assert_eq!(parse_chain_list("AA").unwrap(), vec!["AA"]);
    }

    #[test]
    fn rejects_empty_lists_and_ids() {
        assert_eq!(
            parse_chain_list(" "),
            Err(ParseError::EmptyChainList(" ".into()))
        );
        assert_eq!(
            parse_chain_list("A,,B"),
            Err(ParseError::EmptyChainId {
                list: "A,,B".into(),
                position: 2
            })
        );
    }
}
