//! Parsing of interval-change commands out of request paths.

use canopy_dissemination::token::NodeId;

/// A decoded interval-change command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminCommand {
    /// Node the change is aimed at.
    pub node: NodeId,
    /// Interval code to stamp on the disseminated record.
    pub interval: i32,
}

/// Parses a request path of the exact shape `/s<d>n<d>` into a command.
///
/// Both `<d>` are single decimal digits: `/s2n7` targets node 7 with
/// interval code 2. Every other path, including near misses with extra
/// characters or the wrong markers, is not a command and resolves to
/// `None`. The caller serves the plain status page in that case.
pub fn parse_path(path: &str) -> Option<AdminCommand> {
    let bytes = path.as_bytes();
    if bytes.len() != 5 || bytes[0] != b'/' || bytes[1] != b's' || bytes[3] != b'n' {
        return None;
    }
    let interval = digit(bytes[2])?;
    let node = digit(bytes[4])?;
    Some(AdminCommand { node, interval })
}

fn digit(byte: u8) -> Option<i32> {
    byte.is_ascii_digit()
        .then(|| i32::from(byte.wrapping_sub(b'0')))
}

#[cfg(test)]
mod tests {
    use {super::*, test_case::test_case};

    #[test_case("/s2n3", Some(AdminCommand { node: 3, interval: 2 }); "canonical command")]
    #[test_case("/s1n0", Some(AdminCommand { node: 0, interval: 1 }); "node zero")]
    #[test_case("/s9n9", Some(AdminCommand { node: 9, interval: 9 }); "digits outside known codes still parse")]
    #[test_case("/", None; "root path")]
    #[test_case("/index.html", None; "ordinary page path")]
    #[test_case("/s2n31", None; "trailing digit")]
    #[test_case("/s21n3", None; "two interval digits")]
    #[test_case("/S2n3", None; "uppercase marker")]
    #[test_case("/s2m3", None; "wrong second marker")]
    #[test_case("/sxn3", None; "non digit interval")]
    #[test_case("/s2nx", None; "non digit node")]
    #[test_case("s2n3", None; "missing leading slash")]
    #[test_case("/s2n", None; "truncated")]
    #[test_case("", None; "empty path")]
    fn test_parse_path(path: &str, expected: Option<AdminCommand>) {
        assert_eq!(parse_path(path), expected);
    }
}
