/// Shortens a multiaddr such as `/ip4/1.2.3.4/tcp/4001/p2p/Qm..` to `1.2.3.4:4001`.
pub fn display_address(address: &str) -> String {
    let parts = address
        .split('/')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>();

    let host = parts
        .windows(2)
        .find(|pair| matches!(pair[0], "ip4" | "ip6" | "dns" | "dns4" | "dns6"))
        .map(|pair| pair[1]);
    let port = parts
        .windows(2)
        .find(|pair| matches!(pair[0], "tcp" | "udp"))
        .map(|pair| pair[1]);

    match (host, port) {
        (Some(host), Some(port)) if host.contains(':') => format!("[{host}]:{port}"),
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_owned(),
        _ => address.to_owned(),
    }
}

pub fn format_metric(value: f64) -> String {
    if value == 0.0 {
        "0".to_owned()
    } else if value.abs() >= 100.0 {
        format!("{value:.0}")
    } else if value.abs() >= 0.01 {
        format!("{value:.4}")
    } else {
        format!("{value:.3e}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortens_multiaddrs() {
        assert_eq!(display_address("/ip4/1.2.3.4/tcp/4001/p2p/QmPeer"), "1.2.3.4:4001");
        assert_eq!(display_address("/ip6/2001:db8::1/udp/9000/quic"), "[2001:db8::1]:9000");
        assert_eq!(display_address("10.0.0.1:30303"), "10.0.0.1:30303");
    }

    #[test]
    fn formats_metric_magnitudes() {
        assert_eq!(format_metric(0.0), "0");
        assert_eq!(format_metric(0.25), "0.2500");
        assert_eq!(format_metric(1234.4), "1234");
    }
}
