use std::net::{IpAddr, SocketAddr};

/// Centrality metric used for coloring and the gradient legend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Metric {
    Betweenness,
    Closeness,
    Degree,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Betweenness, Metric::Closeness, Metric::Degree];

    pub fn label(self) -> &'static str {
        match self {
            Self::Betweenness => "betweenness",
            Self::Closeness => "closeness",
            Self::Degree => "degree",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Betweenness => 0,
            Self::Closeness => 1,
            Self::Degree => 2,
        }
    }

    /// Next color mode in the cycle. Every mode is reachable.
    pub fn next(self) -> Self {
        match self {
            Self::Betweenness => Self::Closeness,
            Self::Closeness => Self::Degree,
            Self::Degree => Self::Betweenness,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkClass {
    Public,
    Private,
    Unknown,
}

impl NetworkClass {
    pub fn label(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Unknown => "unknown",
        }
    }

    pub(super) fn from_declared(declared: Option<&str>, address: &str) -> Self {
        match declared.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
            Some("public") => Self::Public,
            Some("private") => Self::Private,
            Some("unknown") => Self::Unknown,
            _ => classify_address(address),
        }
    }
}

/// Classifies an address literal, `host:port` pair or `/ip4/..`/`/ip6/..` multiaddr.
pub fn classify_address(address: &str) -> NetworkClass {
    match extract_ip(address) {
        Some(ip) if is_private_ip(ip) => NetworkClass::Private,
        Some(_) => NetworkClass::Public,
        None if address.trim().eq_ignore_ascii_case("localhost") => NetworkClass::Private,
        None => NetworkClass::Unknown,
    }
}

fn extract_ip(address: &str) -> Option<IpAddr> {
    let trimmed = address.trim();
    if let Ok(ip) = trimmed.parse::<IpAddr>() {
        return Some(ip);
    }
    if let Ok(socket) = trimmed.parse::<SocketAddr>() {
        return Some(socket.ip());
    }

    let mut parts = trimmed.split('/').filter(|part| !part.is_empty());
    while let Some(protocol) = parts.next() {
        if protocol == "ip4" || protocol == "ip6" {
            return parts.next()?.parse().ok();
        }
    }
    None
}

fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GeoLocation {
    pub lat: f64,
    pub long: f64,
    pub city: String,
    pub country: String,
    pub known: bool,
}

impl GeoLocation {
    pub const UNKNOWN_BUCKET: &'static str = "unknown";
    const UNKNOWN_LAT: f64 = -55.0;
    const UNKNOWN_LONG: f64 = -160.0;
    const BUCKET_DEGREES: f64 = 1.0;

    /// Sentinel location shared by every peer without usable coordinates.
    pub fn unknown() -> Self {
        Self {
            lat: Self::UNKNOWN_LAT,
            long: Self::UNKNOWN_LONG,
            city: "unknown".to_owned(),
            country: "unknown".to_owned(),
            known: false,
        }
    }

    /// Coarse `lat:long` bucket key.
    pub fn bucket_key(&self) -> String {
        if !self.known {
            return Self::UNKNOWN_BUCKET.to_owned();
        }
        let lat = (self.lat / Self::BUCKET_DEGREES).round() as i64;
        let long = (self.long / Self::BUCKET_DEGREES).round() as i64;
        format!("{lat}:{long}")
    }

    pub fn place(&self) -> String {
        match (self.city.is_empty(), self.country.is_empty()) {
            (false, false) => format!("{}, {}", self.city, self.country),
            (false, true) => self.city.clone(),
            (true, false) => self.country.clone(),
            (true, true) => "unknown".to_owned(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PeerRecord {
    pub index: usize,
    pub address: String,
    pub betweenness: f64,
    pub closeness: f64,
    pub connections: Vec<usize>,
    /// Undirected neighbour count; a link listed by either side counts once.
    pub degree: usize,
    pub geo: GeoLocation,
    pub network: NetworkClass,
    pub geostr: String,
    pub sub_index: usize,
    pub sub_count: usize,
}

impl PeerRecord {
    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Betweenness => self.betweenness,
            Metric::Closeness => self.closeness,
            Metric::Degree => self.degree as f64,
        }
    }

    pub fn is_malformed(&self) -> bool {
        self.address.trim().is_empty()
    }

    pub fn is_localhost(&self) -> bool {
        extract_ip(&self.address).is_some_and(|ip| ip.is_loopback())
            || self.address.contains("localhost")
    }
}

#[derive(Clone, Debug)]
pub struct Histogram {
    pub metric: String,
    pub min: f64,
    pub max: f64,
    pub buckets: Vec<u64>,
}

#[derive(Clone, Debug)]
pub struct Snapshot {
    pub source: String,
    pub peers: Vec<PeerRecord>,
    pub histograms: Vec<Histogram>,
    pub edge_count: usize,
}

impl Snapshot {
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn histogram(&self, metric: Metric) -> Option<&Histogram> {
        self.histograms
            .iter()
            .find(|histogram| histogram.metric.eq_ignore_ascii_case(metric.label()))
    }

    /// Undirected neighbour lists; a connection listed by either side counts once.
    pub fn adjacency(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![Vec::new(); self.peers.len()];
        for peer in &self.peers {
            for &other in &peer.connections {
                adjacency[peer.index].push(other);
                adjacency[other].push(peer.index);
            }
        }
        for neighbors in &mut adjacency {
            neighbors.sort_unstable();
            neighbors.dedup();
        }
        adjacency
    }
}
