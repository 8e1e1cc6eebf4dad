//! Scrapers for OS9 CLI and XML output
//!
//! `show interfaces switchport` renders something like:
//!
//! ```text
//! Name: TenGigabitEthernet 1/3
//! 802.1QTagged: Hybrid
//! Vlan membership:
//! Q       Vlans
//! U       23
//! T       52,1001-1003
//!
//! Native Vlan Id:         23.
//! ```
//!
//! The layout is specific to the firmware; everything that depends on it stays
//! in this module.

use std::collections::BTreeSet;

use metalnet_switch::{FabricError, FabricResult};
use metalnet_types::{ChannelAssignment, VlanId};
use once_cell::sync::Lazy;
use regex::Regex;

const NATIVE_MARKER: &str = "NativeVlanId:";
const MEMBERSHIP_MARKER: &str = "Vlanmembership:";
const MEMBERSHIP_HEADER: &str = "QVlans";

/// Row codes the membership block may carry (see the `Codes:` legend).
const MEMBERSHIP_CODES: &[char] = &['U', 'T', 'x', 'X', 'G', 'M', 'i', 'I', 'v', 'V'];

static SHUTDOWN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<(?:[\w-]+:)?shutdown>\s*(true|false)\s*</(?:[\w-]+:)?shutdown>")
        .expect("shutdown pattern is valid")
});

/// Channels of one port as reported by the switchport show command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Switchport {
    pub native: Option<VlanId>,
    pub tagged: BTreeSet<VlanId>,
}

impl Switchport {
    pub fn assignments(&self) -> BTreeSet<ChannelAssignment> {
        self.native
            .map(ChannelAssignment::native)
            .into_iter()
            .chain(self.tagged.iter().copied().map(ChannelAssignment::tagged))
            .collect()
    }
}

fn strip_spaces(output: &str) -> String {
    output.replace(' ', "").replace('\t', "")
}

fn parse_vlan(command: &str, text: &str) -> FabricResult<VlanId> {
    text.parse()
        .map_err(|e| FabricError::unexpected_output(command, format!("bad VLAN {text:?}: {e}")))
}

/// Parses both channel kinds out of switchport output.
pub fn parse_switchport(command: &str, output: &str) -> FabricResult<Switchport> {
    Ok(Switchport {
        native: parse_native_vlan(command, output)?,
        tagged: parse_tagged_vlans(command, output)?,
    })
}

/// Reads the native VLAN. The default VLAN is not an assignment and comes
/// back as `None`.
pub fn parse_native_vlan(command: &str, output: &str) -> FabricResult<Option<VlanId>> {
    let compact = strip_spaces(output);
    let start = compact
        .find(NATIVE_MARKER)
        .map(|i| i + NATIVE_MARKER.len())
        .ok_or_else(|| FabricError::unexpected_output(command, "no native VLAN field"))?;

    let rest = &compact[start..];
    let end = rest
        .find(|c: char| c == '.' || c == '\n' || c == '\r')
        .unwrap_or(rest.len());
    let vlan = parse_vlan(command, &rest[..end])?;

    Ok((!vlan.is_default()).then_some(vlan))
}

/// Reads the tagged VLAN memberships.
///
/// The membership block runs from the marker to the first blank line. A
/// port without untagged membership has no `U` row, and long lists wrap
/// onto several `T` rows, so every `T` row of the block is read. A block
/// with no membership row at all, or with a row of unknown code, is
/// rejected rather than read as "no tagged VLANs".
pub fn parse_tagged_vlans(command: &str, output: &str) -> FabricResult<BTreeSet<VlanId>> {
    let compact = strip_spaces(output);
    let mut lines = compact.lines().map(str::trim_end);
    lines
        .by_ref()
        .find(|line| *line == MEMBERSHIP_MARKER)
        .ok_or_else(|| FabricError::unexpected_output(command, "no VLAN membership section"))?;

    let mut tagged = BTreeSet::new();
    let mut rows = 0;
    for row in lines.take_while(|line| !line.is_empty()) {
        if row == MEMBERSHIP_HEADER {
            continue;
        }
        match row.chars().next() {
            Some('T') => parse_vlan_list(command, &row[1..], &mut tagged)?,
            Some(code) if MEMBERSHIP_CODES.contains(&code) => {}
            _ => {
                return Err(FabricError::unexpected_output(
                    command,
                    format!("unknown VLAN membership row {row:?}"),
                ));
            }
        }
        rows += 1;
    }

    if rows == 0 {
        return Err(FabricError::unexpected_output(
            command,
            "empty VLAN membership section",
        ));
    }
    Ok(tagged)
}

/// Expands a comma separated list of ids and `a-b` ranges into `into`.
fn parse_vlan_list(command: &str, list: &str, into: &mut BTreeSet<VlanId>) -> FabricResult<()> {
    for entry in list.split(',').filter(|e| !e.is_empty()) {
        match entry.split_once('-') {
            Some((low, high)) => {
                let low = parse_vlan(command, low)?;
                let high = parse_vlan(command, high)?;
                if low > high {
                    return Err(FabricError::unexpected_output(
                        command,
                        format!("reversed VLAN range {entry:?}"),
                    ));
                }
                for id in low.get()..=high.get() {
                    into.insert(parse_vlan(command, &id.to_string())?);
                }
            }
            None => {
                into.insert(parse_vlan(command, entry)?);
            }
        }
    }
    Ok(())
}

/// Reads the `<shutdown>` element of an interface resource.
pub fn parse_shutdown(url: &str, body: &str) -> FabricResult<bool> {
    SHUTDOWN_RE
        .captures(body)
        .map(|caps| &caps[1] == "true")
        .ok_or_else(|| FabricError::unexpected_output(url, "no shutdown element"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CMD: &str = "interfaces switchport TenGigabitEthernet 1/3";

    const HYBRID: &str = "Codes:  U - Untagged, T - Tagged
        x - Dot1x untagged, X - Dot1x tagged
        G - GVRP tagged, M - Trunk
        i - Internal untagged, I - Internal tagged, v - VLT untagged, V - VLT tagged

Name: TenGigabitEthernet 1/3
802.1QTagged: Hybrid
Vlan membership:
Q       Vlans
U       23
T       52,1001-1003

Native Vlan Id:         23.
";

    const ACCESS_DEFAULT: &str = "Name: TenGigabitEthernet 1/4
802.1QTagged: False
Vlan membership:
Q       Vlans
U       1

Native Vlan Id:         1.
";

    fn vlan(id: u16) -> VlanId {
        VlanId::new(id).unwrap()
    }

    #[test]
    fn test_parse_hybrid_port() {
        let port = parse_switchport(CMD, HYBRID).unwrap();
        assert_eq!(port.native, Some(vlan(23)));
        assert_eq!(
            port.tagged.into_iter().collect::<Vec<_>>(),
            vec![vlan(52), vlan(1001), vlan(1002), vlan(1003)]
        );
    }

    #[test]
    fn test_parse_default_port() {
        let port = parse_switchport(CMD, ACCESS_DEFAULT).unwrap();
        assert_eq!(port, Switchport::default());
        assert!(port.assignments().is_empty());
    }

    #[test]
    fn test_assignments() {
        let port = parse_switchport(CMD, HYBRID).unwrap();
        let assignments = port.assignments();
        assert_eq!(assignments.len(), 5);
        assert!(assignments.contains(&ChannelAssignment::native(vlan(23))));
        assert!(assignments.contains(&ChannelAssignment::tagged(vlan(1002))));
    }

    #[test]
    fn test_parse_tagged_only_port() {
        let output = "Vlan membership:\nQ Vlans\nT 52\n\nNative Vlan Id: 1.\n";
        let port = parse_switchport(CMD, output).unwrap();
        assert_eq!(port.native, None);
        assert_eq!(port.tagged.into_iter().collect::<Vec<_>>(), vec![vlan(52)]);
    }

    #[test]
    fn test_parse_wrapped_tagged_rows() {
        let output = "Vlan membership:\nQ Vlans\nU 23\nT 52,53\nT 1001-1002\n\nNative Vlan Id: 23.\n";
        assert_eq!(
            parse_tagged_vlans(CMD, output).unwrap().into_iter().collect::<Vec<_>>(),
            vec![vlan(52), vlan(53), vlan(1001), vlan(1002)]
        );
    }

    #[test]
    fn test_membership_block_must_have_rows() {
        let empty = "Vlan membership:\nQ Vlans\n\nNative Vlan Id: 1.\n";
        assert!(matches!(
            parse_tagged_vlans(CMD, empty),
            Err(FabricError::UnexpectedOutput { .. })
        ));

        let unknown = "Vlan membership:\nQ Vlans\n52\n\nNative Vlan Id: 1.\n";
        assert!(matches!(
            parse_tagged_vlans(CMD, unknown),
            Err(FabricError::UnexpectedOutput { .. })
        ));
    }

    #[test]
    fn test_native_without_terminator() {
        let output = "Vlan membership:\nQ Vlans\nU 7\n\nNative Vlan Id: 7\n";
        assert_eq!(parse_native_vlan(CMD, output).unwrap(), Some(vlan(7)));
    }

    #[test]
    fn test_unexpected_layout() {
        let result = parse_switchport(CMD, "% Error: Invalid input at \"^\" marker.");
        assert!(matches!(result, Err(FabricError::UnexpectedOutput { .. })));

        let garbled = HYBRID.replace("52,", "5x,");
        assert!(parse_tagged_vlans(CMD, &garbled).is_err());
    }

    #[test]
    fn test_parse_shutdown() {
        let body = r#"<interface xmlns="http://www.dell.com/ns/dell:0.1/root">
  <name>tengig-1-3</name>
  <shutdown>false</shutdown>
</interface>"#;
        assert_eq!(parse_shutdown("url", body).unwrap(), false);
        assert_eq!(
            parse_shutdown("url", "<dell:shutdown>true</dell:shutdown>").unwrap(),
            true
        );
        assert!(parse_shutdown("url", "<interface/>").is_err());
    }
}
