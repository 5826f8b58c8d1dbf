//! Local address discovery and the policy for picking the address to advertise.
//!
//! Overlay-network addresses win over everything else: they are reachable
//! from the companion device without exposing a LAN or WAN address.

use std::net::Ipv4Addr;
use std::process::Command;

use crate::error::ConnectError;

/// Interface-name fragments that identify an overlay (mesh VPN) interface.
const OVERLAY_NAME_PATTERNS: &[&str] = &["tailscale", "utun"];

/// An IPv4 address found on a local interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkAddress {
    pub interface_name: String,
    pub address: Ipv4Addr,
    pub is_preferred: bool,
}

impl NetworkAddress {
    pub fn new(interface_name: impl Into<String>, address: Ipv4Addr) -> Self {
        let interface_name = interface_name.into();
        let is_preferred = is_overlay(&interface_name, address);
        Self {
            interface_name,
            address,
            is_preferred,
        }
    }
}

/// How the advertised address was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressSource {
    /// Reported by the overlay-network CLI.
    OverlayCli,
    /// First enumerated interface that looks like an overlay network.
    PreferredInterface,
    /// First enumerated interface of any kind.
    FirstInterface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedAddress {
    pub address: Ipv4Addr,
    pub source: AddressSource,
}

/// Source of candidate addresses. Failures are reported as absence.
pub trait AddressProvider {
    /// Address assigned by the overlay-network CLI, if it is installed and answers.
    fn overlay_address(&self) -> Option<Ipv4Addr>;

    /// All IPv4, non-loopback interface addresses, in enumeration order.
    fn interface_addresses(&self) -> Vec<NetworkAddress>;
}

/// True when the interface name or address marks an overlay network.
pub fn is_overlay(interface_name: &str, address: Ipv4Addr) -> bool {
    let name = interface_name.to_ascii_lowercase();
    OVERLAY_NAME_PATTERNS.iter().any(|p| name.contains(p)) || is_cgnat(address)
}

/// `100.64.0.0/10`, the carrier-grade NAT block overlay networks allocate from.
pub fn is_cgnat(address: Ipv4Addr) -> bool {
    let [a, b, ..] = address.octets();
    a == 100 && (b & 0b1100_0000) == 0b0100_0000
}

pub fn select_primary_address(
    provider: &impl AddressProvider,
) -> Result<SelectedAddress, ConnectError> {
    if let Some(address) = provider.overlay_address() {
        tracing::debug!(%address, "using overlay CLI address");
        return Ok(SelectedAddress {
            address,
            source: AddressSource::OverlayCli,
        });
    }

    let candidates = provider.interface_addresses();
    tracing::debug!(count = candidates.len(), "enumerated interface addresses");

    if let Some(preferred) = candidates.iter().find(|a| a.is_preferred) {
        return Ok(SelectedAddress {
            address: preferred.address,
            source: AddressSource::PreferredInterface,
        });
    }

    candidates
        .first()
        .map(|a| SelectedAddress {
            address: a.address,
            source: AddressSource::FirstInterface,
        })
        .ok_or(ConnectError::NoInterface)
}

// ── system provider ───────────────────────────────────────

/// Queries the real machine via the overlay CLI and `ip`/`ifconfig`.
pub struct SystemAddressProvider {
    overlay_cli: String,
}

impl SystemAddressProvider {
    pub fn new(overlay_cli: impl Into<String>) -> Self {
        Self {
            overlay_cli: overlay_cli.into(),
        }
    }
}

impl AddressProvider for SystemAddressProvider {
    fn overlay_address(&self) -> Option<Ipv4Addr> {
        let stdout = run_capture(&self.overlay_cli, &["ip", "-4"])?;
        parse_overlay_output(&stdout)
    }

    fn interface_addresses(&self) -> Vec<NetworkAddress> {
        if cfg!(target_os = "linux") {
            if let Some(out) = run_capture("ip", &["-o", "-4", "addr", "show"]) {
                return parse_ip_addr(&out);
            }
        }
        run_capture("ifconfig", &[])
            .map(|out| parse_ifconfig(&out))
            .unwrap_or_default()
    }
}

/// Run a command and return its stdout, or `None` if it is missing or fails.
fn run_capture(program: &str, args: &[&str]) -> Option<String> {
    let output = match Command::new(program).args(args).output() {
        Ok(o) => o,
        Err(e) => {
            tracing::debug!(program, "not available: {e}");
            return None;
        }
    };
    if !output.status.success() {
        tracing::debug!(program, status = %output.status, "command failed");
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// First valid IPv4 line printed by `tailscale ip -4`.
pub fn parse_overlay_output(stdout: &str) -> Option<Ipv4Addr> {
    stdout
        .lines()
        .find_map(|line| line.trim().parse::<Ipv4Addr>().ok())
}

/// Parse `ip -o -4 addr show` output.
///
/// Each line looks like
/// `2: eth0    inet 192.168.1.10/24 brd 192.168.1.255 scope global eth0\ ...`
pub fn parse_ip_addr(stdout: &str) -> Vec<NetworkAddress> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let _index = tokens.next()?;
            let name = tokens.next()?;
            let name = name.split('@').next().unwrap_or(name);
            tokens.find(|t| *t == "inet")?;
            let cidr = tokens.next()?;
            let address: Ipv4Addr = cidr.split('/').next()?.parse().ok()?;
            Some((name.to_string(), address))
        })
        .filter(|(_, address)| !address.is_loopback())
        .map(|(name, address)| NetworkAddress::new(name, address))
        .collect()
}

/// Parse BSD/macOS `ifconfig` output.
pub fn parse_ifconfig(stdout: &str) -> Vec<NetworkAddress> {
    let mut current: Option<&str> = None;
    let mut addresses = Vec::new();

    for line in stdout.lines() {
        if !line.starts_with(char::is_whitespace) {
            current = line.split(':').next().filter(|n| !n.is_empty());
            continue;
        }
        let Some(name) = current else { continue };
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some("inet") {
            continue;
        }
        let Some(address) = tokens.next().and_then(|t| t.parse::<Ipv4Addr>().ok()) else {
            continue;
        };
        if !address.is_loopback() {
            addresses.push(NetworkAddress::new(name, address));
        }
    }

    addresses
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeProvider {
        overlay: Option<Ipv4Addr>,
        interfaces: Vec<NetworkAddress>,
    }

    impl AddressProvider for FakeProvider {
        fn overlay_address(&self) -> Option<Ipv4Addr> {
            self.overlay
        }

        fn interface_addresses(&self) -> Vec<NetworkAddress> {
            self.interfaces.clone()
        }
    }

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    #[test]
    fn overlay_cli_wins_outright() {
        let provider = FakeProvider {
            overlay: Some(ip("100.88.1.2")),
            interfaces: vec![
                NetworkAddress::new("eth0", ip("192.168.1.10")),
                NetworkAddress::new("tailscale0", ip("100.99.0.1")),
            ],
        };
        let selected = select_primary_address(&provider).unwrap();
        assert_eq!(selected.address, ip("100.88.1.2"));
        assert_eq!(selected.source, AddressSource::OverlayCli);
    }

    #[test]
    fn preferred_interface_beats_earlier_lan_address() {
        let provider = FakeProvider {
            overlay: None,
            interfaces: vec![
                NetworkAddress::new("eth0", ip("192.168.1.10")),
                NetworkAddress::new("wlan0", ip("10.0.0.7")),
                NetworkAddress::new("tailscale0", ip("100.99.0.1")),
            ],
        };
        let selected = select_primary_address(&provider).unwrap();
        assert_eq!(selected.address, ip("100.99.0.1"));
        assert_eq!(selected.source, AddressSource::PreferredInterface);
    }

    #[test]
    fn cgnat_address_is_preferred_regardless_of_name() {
        let provider = FakeProvider {
            overlay: None,
            interfaces: vec![
                NetworkAddress::new("en0", ip("192.168.1.10")),
                NetworkAddress::new("wg0", ip("100.127.255.1")),
            ],
        };
        assert_eq!(
            select_primary_address(&provider).unwrap().address,
            ip("100.127.255.1")
        );
    }

    #[test]
    fn falls_back_to_first_address() {
        let provider = FakeProvider {
            overlay: None,
            interfaces: vec![
                NetworkAddress::new("eth0", ip("192.168.1.10")),
                NetworkAddress::new("eth1", ip("10.0.0.7")),
            ],
        };
        let selected = select_primary_address(&provider).unwrap();
        assert_eq!(selected.address, ip("192.168.1.10"));
        assert_eq!(selected.source, AddressSource::FirstInterface);
    }

    #[test]
    fn no_addresses_is_an_error() {
        let provider = FakeProvider {
            overlay: None,
            interfaces: vec![],
        };
        assert!(matches!(
            select_primary_address(&provider),
            Err(ConnectError::NoInterface)
        ));
    }

    #[test]
    fn overlay_name_match_is_case_insensitive() {
        assert!(is_overlay("Tailscale", ip("192.168.1.2")));
        assert!(is_overlay("UTUN3", ip("10.1.1.1")));
        assert!(!is_overlay("eth0", ip("192.168.1.2")));
    }

    #[test]
    fn cgnat_range_bounds() {
        assert!(is_cgnat(ip("100.64.0.0")));
        assert!(is_cgnat(ip("100.127.255.255")));
        assert!(!is_cgnat(ip("100.63.255.255")));
        assert!(!is_cgnat(ip("100.128.0.0")));
        assert!(!is_cgnat(ip("10.64.0.1")));
    }

    #[test]
    fn parse_ip_addr_skips_loopback() {
        let out = "\
1: lo    inet 127.0.0.1/8 scope host lo\\       valid_lft forever preferred_lft forever
2: eth0    inet 192.168.1.10/24 brd 192.168.1.255 scope global dynamic eth0\\       valid_lft 86000sec preferred_lft 86000sec
5: tailscale0    inet 100.101.102.103/32 scope global tailscale0\\       valid_lft forever preferred_lft forever
";
        let addrs = parse_ip_addr(out);
        assert_eq!(addrs.len(), 2);
        assert_eq!(addrs[0].interface_name, "eth0");
        assert_eq!(addrs[0].address, ip("192.168.1.10"));
        assert!(!addrs[0].is_preferred);
        assert_eq!(addrs[1].interface_name, "tailscale0");
        assert!(addrs[1].is_preferred);
    }

    #[test]
    fn parse_ip_addr_strips_link_suffix() {
        let out = "7: veth0@if6    inet 172.17.0.2/16 scope global veth0\n";
        let addrs = parse_ip_addr(out);
        assert_eq!(addrs[0].interface_name, "veth0");
    }

    #[test]
    fn parse_ifconfig_output() {
        let out = "\
lo0: flags=8049<UP,LOOPBACK,RUNNING,MULTICAST> mtu 16384
\tinet 127.0.0.1 netmask 0xff000000
\tinet6 ::1 prefixlen 128
en0: flags=8863<UP,BROADCAST,SMART,RUNNING,SIMPLEX,MULTICAST> mtu 1500
\tether 3c:22:fb:00:00:00
\tinet6 fe80::1%en0 prefixlen 64 secured scopeid 0x6
\tinet 192.168.1.5 netmask 0xffffff00 broadcast 192.168.1.255
utun4: flags=8051<UP,POINTOPOINT,RUNNING,MULTICAST> mtu 1280
\tinet 100.90.1.2 --> 100.90.1.2 netmask 0xffffffff
";
        let addrs = parse_ifconfig(out);
        assert_eq!(
            addrs,
            vec![
                NetworkAddress::new("en0", ip("192.168.1.5")),
                NetworkAddress::new("utun4", ip("100.90.1.2")),
            ]
        );
        assert!(addrs[1].is_preferred);
    }

    #[test]
    fn parse_overlay_output_takes_first_ipv4() {
        assert_eq!(
            parse_overlay_output("100.100.1.1\n"),
            Some(ip("100.100.1.1"))
        );
        assert_eq!(parse_overlay_output(""), None);
        assert_eq!(parse_overlay_output("not running\n"), None);
    }
}
