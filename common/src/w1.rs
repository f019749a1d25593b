pub const W1_DEVICES_DIR: &str = "/sys/bus/w1/devices";

pub fn slave_path(device: &str) -> String {
    format!("{W1_DEVICES_DIR}/{device}/w1_slave")
}

// Line one ends in `YES` when the CRC matched, line two carries `t=<millidegrees>`.
pub fn parse_w1_slave(raw: &str) -> Option<f32> {
    let mut lines = raw.lines();
    let crc_line = lines.next()?;
    if !crc_line.trim_end().ends_with("YES") {
        return None;
    }

    let data_line = lines.next()?;
    let (_, millidegrees) = data_line.rsplit_once("t=")?;
    let millidegrees: i32 = millidegrees.trim().parse().ok()?;
    Some(millidegrees as f32 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_reading() {
        let raw = "72 01 4b 46 7f ff 0e 10 57 : crc=57 YES\n\
                   72 01 4b 46 7f ff 0e 10 57 t=23125\n";
        assert_eq!(parse_w1_slave(raw), Some(23.125));
    }

    #[test]
    fn parses_negative_reading() {
        let raw = "5e ff 4b 46 7f ff 02 10 1f : crc=1f YES\n\
                   5e ff 4b 46 7f ff 02 10 1f t=-10125\n";
        assert_eq!(parse_w1_slave(raw), Some(-10.125));
    }

    #[test]
    fn rejects_crc_failure() {
        let raw = "72 01 4b 46 7f ff 0e 10 57 : crc=00 NO\n\
                   72 01 4b 46 7f ff 0e 10 57 t=23125\n";
        assert_eq!(parse_w1_slave(raw), None);
    }

    #[test]
    fn rejects_truncated_output() {
        assert_eq!(parse_w1_slave(""), None);
        assert_eq!(parse_w1_slave("72 01 : crc=57 YES\n"), None);
        assert_eq!(parse_w1_slave("72 01 : crc=57 YES\n72 01 t=\n"), None);
    }

    #[test]
    fn builds_sysfs_path() {
        assert_eq!(
            slave_path("28-0316a2794aff"),
            "/sys/bus/w1/devices/28-0316a2794aff/w1_slave"
        );
    }
}
