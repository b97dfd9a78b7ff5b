//! Record sinks.
//!
//! The runtime hands every [`DecodedRecord`] to a [`RecordSink`]. The stock
//! sink is [`RecordWriter`], which renders one line per record onto any
//! writer and flushes it straight away so a `tail -f` sees frames live.

use anyhow::{anyhow, Context, Result};
use std::io::{self, Write};

use crate::protocol::DecodedRecord;

pub trait RecordSink {
    fn emit(&mut self, record: &DecodedRecord) -> Result<()>;
}

/// Collects records in memory, mostly for tests and embedding.
impl RecordSink for Vec<DecodedRecord> {
    fn emit(&mut self, record: &DecodedRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// `DATE=..;ERR=..;FRAME=..;SLAVE=..`
    #[default]
    Line,
    /// One JSON object per line
    Json,
}

/// Renders records onto a writer, one per line, flushed per record.
pub struct RecordWriter<W: Write> {
    writer: W,
    format: OutputFormat,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self { writer, format }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for RecordWriter<W> {
    fn emit(&mut self, record: &DecodedRecord) -> Result<()> {
        match self.format {
            OutputFormat::Line => writeln!(self.writer, "{}", record.to_line())?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.writer, record)?;
                self.writer.write_all(b"\n")?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Output destination for records
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputSink {
    #[default]
    Stdout,
    File {
        path: String,
    },
    Pipe {
        path: String,
    },
}

impl std::str::FromStr for OutputSink {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "stdout" || s == "-" {
            Ok(OutputSink::Stdout)
        } else if let Some(path) = s.strip_prefix("file:") {
            Ok(OutputSink::File {
                path: path.to_string(),
            })
        } else if let Some(path) = s.strip_prefix("pipe:") {
            Ok(OutputSink::Pipe {
                path: path.to_string(),
            })
        } else {
            Err(anyhow!(
                "Invalid output format. Use stdout, file:<path> or pipe:<path>"
            ))
        }
    }
}

impl OutputSink {
    /// Open the destination. Files are appended to; pipes must already exist.
    pub fn open(&self) -> Result<Box<dyn Write + Send>> {
        match self {
            OutputSink::Stdout => Ok(Box::new(io::stdout())),
            OutputSink::File { path } => {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("Failed to open output file {path}"))?;
                Ok(Box::new(file))
            }
            OutputSink::Pipe { path } => {
                let file = std::fs::OpenOptions::new()
                    .write(true)
                    .open(path)
                    .with_context(|| format!("Failed to open output pipe {path}"))?;
                Ok(Box::new(file))
            }
        }
    }

    pub fn writer(&self, format: OutputFormat) -> Result<RecordWriter<Box<dyn Write + Send>>> {
        Ok(RecordWriter::new(self.open()?, format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{decode_frame, RawFrame};
    use chrono::{Local, TimeZone};

    fn record(bytes: &[u8]) -> DecodedRecord {
        let ts = Local
            .with_ymd_and_hms(2015, 11, 5, 17, 31, 27)
            .single()
            .unwrap()
            + chrono::Duration::milliseconds(977);
        decode_frame(&RawFrame::new(bytes.to_vec(), ts))
    }

    #[test]
    fn test_line_output() {
        let mut w = RecordWriter::new(Vec::new(), OutputFormat::Line);
        w.emit(&record(&[0x01, 0x03, 0x50, 0x00, 0x00, 0x04, 0x55, 0x09]))
            .unwrap();
        w.emit(&record(&[0x01, 0x83, 0x02])).unwrap();
        let out = String::from_utf8(w.into_inner()).unwrap();
        assert_eq!(
            out,
            "DATE=2015-11-05T17:31:27.977;ERR=NO;FRAME=01-03-50-00-00-04-55-09;SLAVE=1\n\
             DATE=2015-11-05T17:31:27.977;ERR=SHORT_FRAME;FRAME=01-83-02;SLAVE=0\n"
        );
    }

    #[test]
    fn test_json_output() {
        let mut w = RecordWriter::new(Vec::new(), OutputFormat::Json);
        w.emit(&record(&[0x01, 0x03, 0x50, 0x00, 0x00, 0x04, 0x00, 0x00]))
            .unwrap();
        let out = String::from_utf8(w.into_inner()).unwrap();
        assert!(out.ends_with('\n'));
        let v: serde_json::Value = serde_json::from_str(out.trim_end()).unwrap();
        assert_eq!(v["status"], "BAD_CRC");
        assert_eq!(v["slave_id"], 0);
        assert_eq!(v["frame"], "01-03-50-00-00-04-00-00");
    }

    #[test]
    fn test_output_sink_parsing() {
        assert_eq!("stdout".parse::<OutputSink>().unwrap(), OutputSink::Stdout);
        assert_eq!(
            "file:/tmp/bus.log".parse::<OutputSink>().unwrap(),
            OutputSink::File {
                path: "/tmp/bus.log".to_string()
            }
        );
        assert_eq!(
            "pipe:/tmp/bus.fifo".parse::<OutputSink>().unwrap(),
            OutputSink::Pipe {
                path: "/tmp/bus.fifo".to_string()
            }
        );
        assert!("tcp:1234".parse::<OutputSink>().is_err());
    }

    #[test]
    fn test_file_sink_appends() {
        let path = std::env::temp_dir().join(format!("rtutap_sink_{}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let sink = OutputSink::File {
            path: path.to_string_lossy().into_owned(),
        };
        for _ in 0..2 {
            let mut w = sink.writer(OutputFormat::Line).unwrap();
            w.emit(&record(&[0x01, 0x03, 0x50, 0x00, 0x00, 0x04, 0x55, 0x09]))
                .unwrap();
        }
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        let _ = std::fs::remove_file(&path);
    }
}
