//! Nmap XML run-report deserialization.
//!
//! Nmap's `-oX -` flag writes a structured `<nmaprun>` report to stdout.
//! This module provides typed Rust structs that deserialize from that XML
//! using `quick-xml` with serde. Only the parts portwatch reads are modelled;
//! everything else in the report is ignored.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;

use crate::error::ArtifactParseError;

const ROOT_ELEMENT: &str = "nmaprun";

/// Root element: `<nmaprun>`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename = "nmaprun")]
pub struct NmapRun {
    #[serde(rename = "@scanner")]
    pub scanner: Option<String>,
    #[serde(rename = "@args")]
    pub args: Option<String>,
    #[serde(rename = "@startstr")]
    pub start_str: Option<String>,
    #[serde(rename = "@version")]
    pub version: Option<String>,
    #[serde(rename = "host", default)]
    pub hosts: Vec<NmapHost>,
    pub runstats: Option<RunStats>,
}

/// A single host from scan results.
#[derive(Debug, Clone, Deserialize)]
pub struct NmapHost {
    pub status: Option<HostStatus>,
    #[serde(rename = "address", default)]
    pub addresses: Vec<Address>,
    pub ports: Option<Ports>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostStatus {
    #[serde(rename = "@state")]
    pub state: String,
    #[serde(rename = "@reason")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Address {
    #[serde(rename = "@addr")]
    pub addr: String,
    #[serde(rename = "@addrtype")]
    pub addr_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ports {
    #[serde(rename = "port", default)]
    pub ports: Vec<NmapPort>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NmapPort {
    #[serde(rename = "@protocol")]
    pub protocol: String,
    #[serde(rename = "@portid")]
    pub port_id: u16,
    pub state: PortState,
    pub service: Option<NmapService>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortState {
    #[serde(rename = "@state")]
    pub state: String,
    #[serde(rename = "@reason")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NmapService {
    #[serde(rename = "@name")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunStats {
    pub finished: Option<Finished>,
    pub hosts: Option<RunStatsHosts>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Finished {
    #[serde(rename = "@elapsed")]
    pub elapsed: Option<String>,
    #[serde(rename = "@exit")]
    pub exit: Option<String>,
    #[serde(rename = "@errormsg")]
    pub error_msg: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunStatsHosts {
    #[serde(rename = "@up")]
    pub up: Option<String>,
    #[serde(rename = "@down")]
    pub down: Option<String>,
    #[serde(rename = "@total")]
    pub total: Option<String>,
}

impl NmapRun {
    /// The error message nmap recorded when it gave up on the run, if any.
    pub fn error_message(&self) -> Option<&str> {
        let finished = self.runstats.as_ref()?.finished.as_ref()?;
        match (finished.exit.as_deref(), finished.error_msg.as_deref()) {
            (Some("error"), Some(msg)) => Some(msg),
            (Some("error"), None) => Some("unknown error"),
            _ => None,
        }
    }
}

impl NmapHost {
    /// The first address nmap reported for the host.
    pub fn primary_address(&self) -> Option<&str> {
        self.addresses.first().map(|a| a.addr.as_str())
    }

    /// Check if the host is up.
    pub fn is_up(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.state == "up")
    }

    /// All port entries, whatever their state.
    pub fn port_entries(&self) -> &[NmapPort] {
        match &self.ports {
            Some(p) => &p.ports,
            None => &[],
        }
    }
}

impl NmapPort {
    pub fn is_open(&self) -> bool {
        self.state.state == "open"
    }
}

/// Parse nmap XML bytes into a structured `NmapRun`.
///
/// The input must be non-empty and rooted at `<nmaprun>`.
pub fn parse_nmap_xml(xml: &[u8]) -> Result<NmapRun, ArtifactParseError> {
    if xml.iter().all(u8::is_ascii_whitespace) {
        return Err(ArtifactParseError::Empty);
    }
    check_root(xml)?;
    quick_xml::de::from_reader(xml).map_err(|e| ArtifactParseError::Xml(format!("{e}")))
}

/// Find the first element and make sure it is `<nmaprun>`.
fn check_root(xml: &[u8]) -> Result<(), ArtifactParseError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = e.local_name();
                if name.as_ref() == ROOT_ELEMENT.as_bytes() {
                    return Ok(());
                }
                return Err(ArtifactParseError::UnexpectedRoot {
                    found: String::from_utf8_lossy(name.as_ref()).into_owned(),
                });
            }
            Ok(Event::Eof) => return Err(ArtifactParseError::MissingRoot),
            Ok(_) => {}
            Err(e) => return Err(ArtifactParseError::Xml(format!("{e}"))),
        }
        buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUICK_SCAN_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE nmaprun>
<nmaprun scanner="nmap" args="nmap -sn 10.0.1.0/24" startstr="Mon Feb 24 10:00:00 2026">
  <host>
    <status state="up" reason="arp-response"/>
    <address addr="10.0.1.1" addrtype="ipv4"/>
    <address addr="AA:BB:CC:DD:EE:01" addrtype="mac" vendor="TestVendor"/>
    <hostnames>
      <hostname name="gateway.local" type="PTR"/>
    </hostnames>
  </host>
  <host>
    <status state="up" reason="arp-response"/>
    <address addr="10.0.1.10" addrtype="ipv4"/>
  </host>
  <host>
    <status state="down" reason="no-response"/>
    <address addr="10.0.1.99" addrtype="ipv4"/>
  </host>
  <runstats>
    <finished time="1740400000" elapsed="2.50" exit="success"/>
    <hosts up="2" down="1" total="3"/>
  </runstats>
</nmaprun>"#;

    const STANDARD_SCAN_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE nmaprun>
<?xml-stylesheet href="file:///usr/bin/../share/nmap/nmap.xsl" type="text/xsl"?>
<nmaprun scanner="nmap" args="nmap -oX - -Pn 10.0.1.1" startstr="Mon Feb 24 10:05:00 2026" version="7.94">
  <scaninfo type="syn" protocol="tcp" numservices="1000" services="1-1000"/>
  <verbose level="0"/>
  <debugging level="0"/>
  <host starttime="1740400000" endtime="1740400015">
    <status state="up" reason="user-set"/>
    <address addr="10.0.1.1" addrtype="ipv4"/>
    <hostnames>
      <hostname name="web-server.local" type="PTR"/>
    </hostnames>
    <ports>
      <extraports state="closed" count="996"/>
      <port protocol="tcp" portid="22">
        <state state="open" reason="syn-ack"/>
        <service name="ssh" method="table" conf="3"/>
      </port>
      <port protocol="tcp" portid="80">
        <state state="open" reason="syn-ack"/>
        <service name="http" method="table" conf="3"/>
      </port>
      <port protocol="tcp" portid="3306">
        <state state="filtered" reason="no-response"/>
      </port>
      <port protocol="udp" portid="161">
        <state state="open|filtered" reason="no-response"/>
      </port>
    </ports>
    <times srtt="350" rttvar="120" to="100000"/>
  </host>
  <runstats>
    <finished time="1740400100" elapsed="15.30" exit="success"/>
    <hosts up="1" down="0" total="1"/>
  </runstats>
</nmaprun>"#;

    #[test]
    fn test_parse_quick_scan() {
        let result = parse_nmap_xml(QUICK_SCAN_XML.as_bytes()).unwrap();
        assert_eq!(result.hosts.len(), 3);

        let up_hosts: Vec<_> = result.hosts.iter().filter(|h| h.is_up()).collect();
        assert_eq!(up_hosts.len(), 2);

        let gateway = &result.hosts[0];
        assert_eq!(gateway.primary_address(), Some("10.0.1.1"));
        assert!(gateway.port_entries().is_empty());

        let stats = result.runstats.as_ref().unwrap();
        let host_stats = stats.hosts.as_ref().unwrap();
        assert_eq!(host_stats.up.as_deref(), Some("2"));
        assert_eq!(host_stats.total.as_deref(), Some("3"));
        assert_eq!(result.error_message(), None);
    }

    #[test]
    fn test_parse_standard_scan() {
        let result = parse_nmap_xml(STANDARD_SCAN_XML.as_bytes()).unwrap();
        assert_eq!(result.hosts.len(), 1);
        assert_eq!(result.version.as_deref(), Some("7.94"));

        let host = &result.hosts[0];
        assert!(host.is_up());
        assert_eq!(host.primary_address(), Some("10.0.1.1"));

        let ports = host.port_entries();
        assert_eq!(ports.len(), 4);

        let ssh = &ports[0];
        assert_eq!(ssh.port_id, 22);
        assert_eq!(ssh.protocol, "tcp");
        assert!(ssh.is_open());
        assert_eq!(ssh.service.as_ref().unwrap().name, "ssh");

        let filtered = &ports[2];
        assert_eq!(filtered.port_id, 3306);
        assert!(!filtered.is_open());
        assert!(filtered.service.is_none());

        assert!(!ports[3].is_open());
    }

    #[test]
    fn test_parse_empty_scan() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE nmaprun>
<nmaprun scanner="nmap" args="nmap -sn 192.168.99.0/24">
  <runstats>
    <finished elapsed="1.00"/>
    <hosts up="0" down="256" total="256"/>
  </runstats>
</nmaprun>"#;

        let result = parse_nmap_xml(xml.as_bytes()).unwrap();
        assert_eq!(result.hosts.len(), 0);
    }

    #[test]
    fn test_error_exit_is_reported() {
        let xml = r#"<nmaprun scanner="nmap">
  <runstats>
    <finished elapsed="0.10" exit="error" errormsg="Failed to open device eth9"/>
  </runstats>
</nmaprun>"#;

        let result = parse_nmap_xml(xml.as_bytes()).unwrap();
        assert_eq!(result.error_message(), Some("Failed to open device eth9"));
    }

    #[test]
    fn test_rejects_empty_input() {
        assert!(matches!(parse_nmap_xml(b""), Err(ArtifactParseError::Empty)));
        assert!(matches!(
            parse_nmap_xml(b"  \n\t "),
            Err(ArtifactParseError::Empty)
        ));
    }

    #[test]
    fn test_rejects_plain_text() {
        let err = parse_nmap_xml(b"This is not xml").unwrap_err();
        assert!(matches!(err, ArtifactParseError::MissingRoot));
    }

    #[test]
    fn test_rejects_foreign_root() {
        let err = parse_nmap_xml(b"<report><host/></report>").unwrap_err();
        match err {
            ArtifactParseError::UnexpectedRoot { found } => assert_eq!(found, "report"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rejects_out_of_range_port() {
        let xml = r#"<nmaprun>
  <host>
    <address addr="10.0.1.1" addrtype="ipv4"/>
    <ports>
      <port protocol="tcp" portid="70000"><state state="open"/></port>
    </ports>
  </host>
</nmaprun>"#;

        assert!(matches!(
            parse_nmap_xml(xml.as_bytes()),
            Err(ArtifactParseError::Xml(_))
        ));
    }

    #[test]
    fn test_rejects_truncated_report() {
        let truncated = &STANDARD_SCAN_XML[..STANDARD_SCAN_XML.len() / 2];
        assert!(parse_nmap_xml(truncated.as_bytes()).is_err());
    }
}
