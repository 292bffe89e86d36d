//! Node address normalization

/// Host used when the operator gives no node address
pub const DEFAULT_NODE_HOST: &str = "127.0.0.1";

/// CLI webserver port of the node
pub const DEFAULT_NODE_PORT: &str = "7935";

/// Turn an operator supplied node address into a base URL.
///
/// `""` and `":port"` use the default host, a bare host gets the default
/// port, and a missing scheme becomes `http://`. Not IPv6 safe.
pub fn node_address(raw: &str, default_host: &str, default_port: &str) -> String {
    let raw = raw.trim();
    let addr = if raw.is_empty() {
        format!("{default_host}:{default_port}")
    } else if raw.starts_with(':') {
        format!("{default_host}{raw}")
    } else if !raw.contains(':') {
        format!("{raw}:{default_port}")
    } else {
        raw.to_string()
    };

    if addr.starts_with("http") {
        addr
    } else {
        format!("http://{addr}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(raw: &str) -> String {
        node_address(raw, DEFAULT_NODE_HOST, DEFAULT_NODE_PORT)
    }

    #[test]
    fn test_node_address_defaults() {
        assert_eq!(addr(""), "http://127.0.0.1:7935");
        assert_eq!(addr(":8935"), "http://127.0.0.1:8935");
        assert_eq!(addr("node.local"), "http://node.local:7935");
        assert_eq!(addr("10.0.0.2:9000"), "http://10.0.0.2:9000");
    }

    #[test]
    fn test_node_address_keeps_scheme() {
        assert_eq!(addr("https://node.example:443"), "https://node.example:443");
        assert_eq!(addr("http://localhost:7935"), "http://localhost:7935");
    }
}
