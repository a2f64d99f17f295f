//! Waveform recording for simulation output.
//!
//! The [`WaveformRecorder`] trait abstracts waveform output. [`VcdRecorder`]
//! implements the IEEE 1364 Value Change Dump (VCD) format, producing text
//! files that can be viewed in GTKWave, Surfer, or other waveform viewers.

use std::io::Write;

use crate::error::SimError;
use crate::ids::SignalId;
use crate::value::Value;

/// Trait for recording simulation waveforms.
pub trait WaveformRecorder {
    /// Registers a signal for recording.
    fn register_signal(&mut self, id: SignalId, name: &str, width: u32) -> Result<(), SimError>;

    /// Opens a new scope (hierarchy level) in the waveform.
    fn begin_scope(&mut self, name: &str) -> Result<(), SimError>;

    /// Closes the current scope.
    fn end_scope(&mut self) -> Result<(), SimError>;

    /// Records a value change at the given tick.
    fn record_change(&mut self, ticks: u64, id: SignalId, value: Value) -> Result<(), SimError>;

    /// Flushes buffered output. May be called more than once.
    fn finalize(&mut self) -> Result<(), SimError>;
}

/// VCD (Value Change Dump) recorder following IEEE 1364.
///
/// Signal identifiers use printable ASCII characters starting from `!`.
/// Integer values are written in two's complement at the registered width.
pub struct VcdRecorder<W: Write> {
    writer: W,
    timescale: String,
    id_map: Vec<(SignalId, String, u32)>, // (signal, id code, width)
    header_written: bool,
    definitions_closed: bool,
    dumpvars_open: bool,
    current_time: Option<u64>,
}

impl<W: Write> VcdRecorder<W> {
    /// Creates a recorder with a `1ns` timescale.
    pub fn new(writer: W) -> Self {
        Self::with_timescale(writer, "1ns")
    }

    /// Creates a recorder with an explicit timescale such as `"10ps"`.
    pub fn with_timescale(writer: W, timescale: impl Into<String>) -> Self {
        Self {
            writer,
            timescale: timescale.into(),
            id_map: Vec::new(),
            header_written: false,
            definitions_closed: false,
            dumpvars_open: false,
            current_time: None,
        }
    }

    /// Consumes the recorder and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_header(&mut self) -> Result<(), SimError> {
        if self.header_written {
            return Ok(());
        }
        writeln!(self.writer, "$version")?;
        writeln!(self.writer, "  Ripple delta-cycle simulator")?;
        writeln!(self.writer, "$end")?;
        writeln!(self.writer, "$timescale")?;
        writeln!(self.writer, "  {}", self.timescale)?;
        writeln!(self.writer, "$end")?;
        self.header_written = true;
        Ok(())
    }

    fn close_definitions(&mut self) -> Result<(), SimError> {
        if self.definitions_closed {
            return Ok(());
        }
        self.write_header()?;
        writeln!(self.writer, "$enddefinitions $end")?;
        self.definitions_closed = true;
        Ok(())
    }

    /// Ends the initial `$dumpvars` block, once.
    fn close_dumpvars(&mut self) -> Result<(), SimError> {
        if self.dumpvars_open {
            writeln!(self.writer, "$end")?;
            self.dumpvars_open = false;
        }
        Ok(())
    }

    /// Generates a VCD identifier code from a sequential index.
    fn make_id_code(index: usize) -> String {
        let mut result = String::new();
        let mut idx = index;
        loop {
            result.push(char::from(b'!' + (idx % 94) as u8));
            idx /= 94;
            if idx == 0 {
                break;
            }
            idx -= 1;
        }
        result
    }

    /// Formats a value: a bare digit for 1-bit signals, `b<bits>` otherwise.
    fn format_value(value: Value, width: u32) -> String {
        let raw = match value {
            Value::Bool(b) => u64::from(b),
            Value::Int(v) => v as u64,
        };
        if width == 1 {
            return (raw & 1).to_string();
        }
        let mut s = String::with_capacity(width as usize + 1);
        s.push('b');
        for bit in (0..width.min(64)).rev() {
            s.push(if raw >> bit & 1 == 1 { '1' } else { '0' });
        }
        s
    }
}

impl<W: Write> WaveformRecorder for VcdRecorder<W> {
    fn register_signal(&mut self, id: SignalId, name: &str, width: u32) -> Result<(), SimError> {
        self.write_header()?;
        let id_code = Self::make_id_code(self.id_map.len());
        writeln!(self.writer, "$var reg {width} {id_code} {name} $end")?;
        self.id_map.push((id, id_code, width));
        Ok(())
    }

    fn begin_scope(&mut self, name: &str) -> Result<(), SimError> {
        self.write_header()?;
        writeln!(self.writer, "$scope module {name} $end")?;
        Ok(())
    }

    fn end_scope(&mut self) -> Result<(), SimError> {
        writeln!(self.writer, "$upscope $end")?;
        Ok(())
    }

    fn record_change(&mut self, ticks: u64, id: SignalId, value: Value) -> Result<(), SimError> {
        match self.current_time {
            None => {
                self.close_definitions()?;
                writeln!(self.writer, "#{ticks}")?;
                writeln!(self.writer, "$dumpvars")?;
                self.dumpvars_open = true;
                self.current_time = Some(ticks);
            }
            Some(t) if t != ticks => {
                self.close_dumpvars()?;
                writeln!(self.writer, "#{ticks}")?;
                self.current_time = Some(ticks);
            }
            Some(_) => {}
        }

        let Some((_, id_code, width)) = self.id_map.iter().find(|(sid, _, _)| *sid == id) else {
            // Signals created after registration are not traced.
            return Ok(());
        };
        let val_str = Self::format_value(value, *width);
        if *width == 1 {
            writeln!(self.writer, "{val_str}{id_code}")?;
        } else {
            writeln!(self.writer, "{val_str} {id_code}")?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SimError> {
        self.close_definitions()?;
        self.close_dumpvars()?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_recorder() -> VcdRecorder<Vec<u8>> {
        VcdRecorder::new(Vec::new())
    }

    fn output(rec: VcdRecorder<Vec<u8>>) -> String {
        String::from_utf8(rec.into_inner()).unwrap()
    }

    #[test]
    fn id_codes() {
        assert_eq!(VcdRecorder::<Vec<u8>>::make_id_code(0), "!");
        assert_eq!(VcdRecorder::<Vec<u8>>::make_id_code(93), "~");
        assert_eq!(VcdRecorder::<Vec<u8>>::make_id_code(94).len(), 2);
    }

    #[test]
    fn register_signal_writes_var() {
        let mut rec = make_recorder();
        rec.begin_scope("top").unwrap();
        rec.register_signal(SignalId::from_raw(0), "clock", 1).unwrap();
        rec.register_signal(SignalId::from_raw(1), "count", 8).unwrap();
        rec.end_scope().unwrap();

        let out = output(rec);
        assert!(out.contains("$scope module top $end"));
        assert!(out.contains("$var reg 1 ! clock $end"));
        assert!(out.contains("$var reg 8 \" count $end"));
        assert!(out.contains("$upscope $end"));
        assert!(out.contains("1ns"));
    }

    #[test]
    fn records_changes_with_timestamps() {
        let mut rec = make_recorder();
        rec.begin_scope("top").unwrap();
        rec.register_signal(SignalId::from_raw(0), "clock", 1).unwrap();
        rec.end_scope().unwrap();

        rec.record_change(0, SignalId::from_raw(0), Value::Bool(true)).unwrap();
        rec.record_change(10, SignalId::from_raw(0), Value::Bool(false)).unwrap();
        rec.finalize().unwrap();

        let out = output(rec);
        let defs = out.find("$enddefinitions $end").unwrap();
        let dump = out.find("$dumpvars").unwrap();
        assert!(defs < dump);
        assert!(out.contains("#0\n$dumpvars\n1!\n$end\n#10\n0!\n"), "{out}");
    }

    #[test]
    fn dumpvars_closed_on_finalize() {
        let mut rec = make_recorder();
        rec.register_signal(SignalId::from_raw(0), "reset", 1).unwrap();
        rec.record_change(0, SignalId::from_raw(0), Value::Bool(true)).unwrap();
        rec.finalize().unwrap();
        rec.finalize().unwrap();
        let out = output(rec);
        assert!(out.ends_with("$dumpvars\n1!\n$end\n"), "{out}");
    }

    #[test]
    fn custom_timescale_in_header() {
        let mut rec = VcdRecorder::with_timescale(Vec::new(), "10ps");
        rec.finalize().unwrap();
        let out = output(rec);
        assert!(out.contains("$timescale\n  10ps\n$end"), "{out}");
        assert!(!out.contains("1ns"));
    }

    #[test]
    fn negative_integers_use_twos_complement() {
        assert_eq!(
            VcdRecorder::<Vec<u8>>::format_value(Value::Int(-1), 8),
            "b11111111"
        );
        assert_eq!(
            VcdRecorder::<Vec<u8>>::format_value(Value::Int(-128), 8),
            "b10000000"
        );
        assert_eq!(
            VcdRecorder::<Vec<u8>>::format_value(Value::Int(5), 4),
            "b0101"
        );
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut rec = make_recorder();
        rec.finalize().unwrap();
        rec.finalize().unwrap();
        let out = output(rec);
        assert_eq!(out.matches("$enddefinitions $end").count(), 1);
    }

    #[test]
    fn unregistered_signal_is_ignored() {
        let mut rec = make_recorder();
        rec.record_change(0, SignalId::from_raw(9), Value::Int(3)).unwrap();
        rec.finalize().unwrap();
        let out = output(rec);
        assert!(!out.contains("b"));
    }
}
