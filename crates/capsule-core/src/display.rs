//! Display helpers shared by the view models

/// Shorten an account for display: first 6 and last 4 characters.
///
/// Inputs shorter than 10 characters are returned unchanged.
pub fn truncate_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() < 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Block explorer link for a transaction
pub fn explorer_tx_url(explorer_base: &str, tx_hash: &str) -> String {
    format!("{}/tx/{}", explorer_base.trim_end_matches('/'), tx_hash)
}
