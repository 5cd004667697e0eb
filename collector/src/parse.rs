//! Parsers for the text output of the OS tools the built-in collectors run.
//!
//! They are deliberately lenient: unknown lines are skipped and only fields that are present on
//! every mainstream distribution are extracted.

use crate::{
    CollectError,
    Metrics,
};
use cluster_report_config::ParserKind;
use serde_json::{
    json,
    Value,
};

/// `/proc/loadavg`: `0.52 0.58 0.59 2/1234 56789`
pub fn load_average(output: &str) -> Result<Value, CollectError> {
    let fields: Vec<f64> = output
        .split_whitespace()
        .take(3)
        .map(|field| field.parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| CollectError::execution(format!("unparseable load average {output:?}: {e}")))?;

    match fields.as_slice() {
        [one, five, fifteen] => Ok(json!({ "1m": one, "5m": five, "15m": fifteen })),
        _ => Err(CollectError::execution(format!("truncated load average {output:?}"))),
    }
}

/// `/proc/uptime`: seconds since boot and aggregate idle seconds.
pub fn uptime_seconds(output: &str) -> Result<f64, CollectError> {
    output
        .split_whitespace()
        .next()
        .and_then(|field| field.parse::<f64>().ok())
        .ok_or_else(|| CollectError::execution(format!("unparseable uptime {output:?}")))
}

/// `MemTotal` from `/proc/meminfo`, in kilobytes.
pub fn mem_total_kb(output: &str) -> Option<u64> {
    output.lines().find_map(|line| {
        let rest = line.strip_prefix("MemTotal:")?;
        rest.split_whitespace().next()?.parse().ok()
    })
}

/// `free -m`: the `Mem:` and `Swap:` rows.
pub fn free_megabytes(output: &str) -> Result<Value, CollectError> {
    let mut memory = None;
    let mut swap = None;

    for line in output.lines() {
        let mut fields = line.split_whitespace();
        let label = fields.next();
        let numbers: Vec<u64> = fields.filter_map(|field| field.parse().ok()).collect();
        match (label, numbers.as_slice()) {
            // total used free shared buff/cache available
            (Some("Mem:"), [total, used, free, _shared, _cache, available, ..]) => {
                memory = Some(json!({
                    "total_mb": total,
                    "used_mb": used,
                    "free_mb": free,
                    "available_mb": available,
                    "used_percent": percent(total.saturating_sub(*available), *total),
                }));
            }
            // Older procps without the `available` column.
            (Some("Mem:"), [total, used, free, ..]) => {
                memory = Some(json!({
                    "total_mb": total,
                    "used_mb": used,
                    "free_mb": free,
                    "used_percent": percent(*used, *total),
                }));
            }
            (Some("Swap:"), [total, used, free, ..]) => {
                swap = Some(json!({
                    "total_mb": total,
                    "used_mb": used,
                    "free_mb": free,
                    "used_percent": percent(*used, *total),
                }));
            }
            _ => {}
        }
    }

    let memory = memory.ok_or_else(|| CollectError::execution("`free -m` output has no Mem: row"))?;
    Ok(json!({ "memory": memory, "swap": swap.unwrap_or(Value::Null) }))
}

/// `df -P -k`: one entry per mounted filesystem, pseudo filesystems excluded.
pub fn filesystems(output: &str) -> Vec<Value> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [device, total, used, available, capacity, mount @ ..] = fields.as_slice() else {
                return None;
            };
            if mount.is_empty() {
                return None;
            }
            if matches!(*device, "tmpfs" | "devtmpfs" | "overlay" | "none" | "udev") {
                return None;
            }
            let total_kb: u64 = total.parse().ok()?;
            Some(json!({
                "device": device,
                "mount_point": mount.join(" "),
                "total_kb": total_kb,
                "used_kb": used.parse::<u64>().ok()?,
                "available_kb": available.parse::<u64>().ok()?,
                "used_percent": capacity.trim_end_matches('%').parse::<f64>().ok()?,
            }))
        })
        .collect()
}

/// `/proc/net/dev`: per interface byte, packet, error and drop counters since boot.
pub fn interfaces(output: &str) -> Vec<Value> {
    output
        .lines()
        .skip(2)
        .filter_map(|line| {
            let (name, counters) = line.split_once(':')?;
            let counters: Vec<u64> = counters
                .split_whitespace()
                .map(|field| field.parse().ok())
                .collect::<Option<_>>()?;
            if counters.len() < 16 {
                return None;
            }
            Some(json!({
                "interface": name.trim(),
                "rx_bytes": counters[0],
                "rx_packets": counters[1],
                "rx_errors": counters[2],
                "rx_dropped": counters[3],
                "tx_bytes": counters[8],
                "tx_packets": counters[9],
                "tx_errors": counters[10],
                "tx_dropped": counters[11],
            }))
        })
        .collect()
}

/// `key=value` or `key: value` lines. Lines without a separator are ignored.
pub fn key_values(output: &str) -> Metrics {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let (key, value) = line.split_once('=').or_else(|| line.split_once(':'))?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), scalar(value.trim())))
        })
        .collect()
}

/// Turns command output into metrics according to `parser`.
pub fn command_output(parser: ParserKind, output: &[u8]) -> Result<Metrics, CollectError> {
    let text = String::from_utf8_lossy(output);
    match parser {
        ParserKind::Json => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Ok(Metrics::from_iter([("value".to_string(), other)])),
            Err(e) => Err(CollectError::execution(format!("output is not valid JSON: {e}"))),
        },
        ParserKind::KeyValue => Ok(key_values(&text)),
        ParserKind::Raw => Ok(raw(&text)),
        ParserKind::Auto => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Ok(raw(&text)),
        },
    }
}

fn raw(text: &str) -> Metrics {
    Metrics::from_iter([("raw".to_string(), Value::String(text.trim_end().to_string()))])
}

fn scalar(value: &str) -> Value {
    if let Ok(int) = value.parse::<i64>() {
        return json!(int);
    }
    if let Ok(float) = value.parse::<f64>() {
        if float.is_finite() {
            return json!(float);
        }
    }
    match value {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(value.to_string()),
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((part as f64 / total as f64) * 1000.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_load_average() {
        let value = load_average("0.52 0.58 1.59 2/1234 56789\n").unwrap();
        assert_eq!(value, json!({ "1m": 0.52, "5m": 0.58, "15m": 1.59 }));
        assert!(load_average("0.52 0.58").is_err());
        assert!(load_average("n/a").is_err());
    }

    #[test]
    fn parses_uptime_and_meminfo() {
        assert_eq!(uptime_seconds("350735.47 234388.90\n").unwrap(), 350735.47);
        assert!(uptime_seconds("").is_err());

        let meminfo = "MemTotal:       16314220 kB\nMemFree:         1024000 kB\n";
        assert_eq!(mem_total_kb(meminfo), Some(16314220));
        assert_eq!(mem_total_kb("MemFree: 1 kB"), None);
    }

    #[test]
    fn parses_free_output() {
        let output = "\
              total        used        free      shared  buff/cache   available
Mem:          15931        4213        6310         412        5407       11012
Swap:          2047           0        2047
";
        let value = free_megabytes(output).unwrap();
        assert_eq!(value["memory"]["total_mb"], json!(15931));
        assert_eq!(value["memory"]["available_mb"], json!(11012));
        assert_eq!(value["memory"]["used_percent"], json!(30.9));
        assert_eq!(value["swap"]["used_percent"], json!(0.0));

        assert!(free_megabytes("garbage").is_err());
    }

    #[test]
    fn parses_filesystems() {
        let output = "\
Filesystem     1024-blocks     Used Available Capacity Mounted on
/dev/nvme0n1p2   490617784 61221284 404401300      14% /
tmpfs              8157108        0   8157108       0% /dev/shm
/dev/nvme0n1p1      523248     6220    517028       2% /boot/efi
";
        let disks = filesystems(output);
        assert_eq!(disks.len(), 2);
        assert_eq!(disks[0]["mount_point"], json!("/"));
        assert_eq!(disks[0]["used_percent"], json!(14.0));
        assert_eq!(disks[1]["device"], json!("/dev/nvme0n1p1"));
    }

    #[test]
    fn keeps_spaces_in_mount_points() {
        let output = "\
Filesystem     1024-blocks      Used Available Capacity Mounted on
/dev/sdb1        976762584 488381292 488381292      50% /mnt/My Disk
";
        let disks = filesystems(output);
        assert_eq!(disks.len(), 1);
        assert_eq!(disks[0]["mount_point"], json!("/mnt/My Disk"));
        assert_eq!(disks[0]["used_percent"], json!(50.0));
    }

    #[test]
    fn parses_interface_counters() {
        let output = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo: 4521690   41210    0    0    0     0          0         0  4521690   41210    0    0    0     0       0          0
  eth0: 987654321 812345   3   12    0     0          0      1024 123456789  543210    0    1    0     0       0          0
garbage line
";
        let interfaces = interfaces(output);
        assert_eq!(interfaces.len(), 2);
        assert_eq!(interfaces[0]["interface"], json!("lo"));
        assert_eq!(interfaces[1]["rx_bytes"], json!(987654321u64));
        assert_eq!(interfaces[1]["rx_dropped"], json!(12));
        assert_eq!(interfaces[1]["tx_packets"], json!(543210));
        assert_eq!(interfaces[1]["tx_dropped"], json!(1));
    }

    #[test]
    fn parses_command_output() {
        let metrics = command_output(ParserKind::Auto, br#"{"connections": 12}"#).unwrap();
        assert_eq!(metrics["connections"], json!(12));

        let metrics = command_output(ParserKind::Auto, b"nginx version: nginx/1.24.0\n").unwrap();
        assert_eq!(metrics["raw"], json!("nginx version: nginx/1.24.0"));

        let metrics = command_output(ParserKind::KeyValue, b"workers=4\nratio: 0.5\nmode = active\nnoise\n").unwrap();
        assert_eq!(metrics.len(), 3);
        assert_eq!(metrics["workers"], json!(4));
        assert_eq!(metrics["ratio"], json!(0.5));
        assert_eq!(metrics["mode"], json!("active"));

        assert!(command_output(ParserKind::Json, b"not json").is_err());
        let metrics = command_output(ParserKind::Json, b"[1, 2]").unwrap();
        assert_eq!(metrics["value"], json!([1, 2]));
    }
}
