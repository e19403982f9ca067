use crate::process::ProcessRecord;
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const EXPORT_HEADER: [&str; 7] = [
    "PID",
    "Name",
    "User",
    "CPU%",
    "Memory (MB)",
    "Priority",
    "Threads",
];

/// Writes the header and one comma-separated row per record.
pub fn write_table<W: Write>(mut out: W, records: &[ProcessRecord]) -> io::Result<()> {
    writeln!(out, "{}", EXPORT_HEADER.join(","))?;
    for record in records {
        writeln!(
            out,
            "{},{},{},{:.1},{},{},{}",
            record.pid,
            escape_field(&record.name),
            escape_field(&record.user),
            record.cpu_percent,
            record.memory_mb,
            record.priority,
            record.threads,
        )?;
    }
    out.flush()
}

pub fn render_table(records: &[ProcessRecord]) -> String {
    let mut buf = Vec::new();
    // Writing to a Vec cannot fail.
    let _ = write_table(&mut buf, records);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Exports `records` to `path`, replacing it only once the whole file has been
/// written. Returns the number of data rows.
pub fn export_to_path(path: &Path, records: &[ProcessRecord]) -> io::Result<usize> {
    let tmp = temp_path(path);
    let result = File::create(&tmp)
        .and_then(|file| {
            let mut writer = BufWriter::new(file);
            write_table(&mut writer, records)?;
            writer.into_inner().map_err(|e| e.into_error())?.sync_all()
        })
        .and_then(|()| fs::rename(&tmp, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result.map(|()| records.len())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

/// Quotes fields containing a delimiter, quote or line break.
fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains(&[',', '"', '\n', '\r'][..]) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
