//! Dobiss wire framing.
//!
//! Every frame is a 16-byte header followed by `record_size * record_count`
//! body bytes:
//!
//! ```text
//! AF | cmd | module type | address | 00 00 | record size | record count | FF x7 | AF
//! ```
//!
//! Replies echo the command of their request.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use domain::{DiscoveredModule, DomainError, ModuleType, Output, OutputType};

pub const FRAME_MARKER: u8 = 0xAF;
pub const HEADER_LEN: usize = 16;
/// Wildcard for the module type/address header fields
pub const ANY: u8 = 0xFF;

const MODULE_RECORD_LEN: usize = 2;
const OUTPUT_RECORD_LEN: usize = 20;
const OUTPUT_NAME_LEN: usize = 16;
const ACTION_RECORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Status,
    Action,
    ListModules,
    ListOutputs,
}

impl Command {
    pub fn code(&self) -> u8 {
        match self {
            Self::Status => 0x01,
            Self::Action => 0x02,
            Self::ListModules => 0x0A,
            Self::ListOutputs => 0x0B,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::Status),
            0x02 => Some(Self::Action),
            0x0A => Some(Self::ListModules),
            0x0B => Some(Self::ListOutputs),
            _ => None,
        }
    }
}

pub fn module_type_code(module_type: ModuleType) -> u8 {
    match module_type {
        ModuleType::Relay => 0x08,
        ModuleType::Dimmer => 0x10,
        ModuleType::Volt => 0x18,
    }
}

pub fn module_type_from_code(code: u8) -> Result<ModuleType, DomainError> {
    match code {
        0x08 => Ok(ModuleType::Relay),
        0x10 => Ok(ModuleType::Dimmer),
        0x18 => Ok(ModuleType::Volt),
        other => Err(DomainError::protocol(format!(
            "unknown module type 0x{:02X}",
            other
        ))),
    }
}

pub fn output_type_code(output_type: OutputType) -> u8 {
    match output_type {
        OutputType::Relay => 0,
        OutputType::Dimmer => 1,
        OutputType::Fan => 2,
        OutputType::Plug => 3,
        OutputType::Up => 4,
        OutputType::Down => 5,
    }
}

pub fn output_type_from_code(code: u8) -> Result<OutputType, DomainError> {
    match code {
        0 => Ok(OutputType::Relay),
        1 => Ok(OutputType::Dimmer),
        2 => Ok(OutputType::Fan),
        3 => Ok(OutputType::Plug),
        4 => Ok(OutputType::Up),
        5 => Ok(OutputType::Down),
        other => Err(DomainError::protocol(format!(
            "unknown output type {}",
            other
        ))),
    }
}

/// Frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub command: Command,
    pub module_type: u8,
    pub address: u8,
    pub record_size: u8,
    pub record_count: u8,
}

impl Header {
    pub fn new(command: Command, module_type: u8, address: u8) -> Self {
        Self {
            command,
            module_type,
            address,
            record_size: 0,
            record_count: 0,
        }
    }

    pub fn with_records(mut self, record_size: u8, record_count: u8) -> Self {
        self.record_size = record_size;
        self.record_count = record_count;
        self
    }

    pub fn body_len(&self) -> usize {
        usize::from(self.record_size) * usize::from(self.record_count)
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(HEADER_LEN);
        buf.put_u8(FRAME_MARKER);
        buf.put_u8(self.command.code());
        buf.put_u8(self.module_type);
        buf.put_u8(self.address);
        buf.put_u16(0);
        buf.put_u8(self.record_size);
        buf.put_u8(self.record_count);
        buf.put_bytes(0xFF, 7);
        buf.put_u8(FRAME_MARKER);
    }

    pub fn decode(raw: &[u8]) -> Result<Self, DomainError> {
        if raw.len() != HEADER_LEN {
            return Err(DomainError::protocol(format!(
                "header must be {} bytes, got {}",
                HEADER_LEN,
                raw.len()
            )));
        }
        if raw[0] != FRAME_MARKER || raw[HEADER_LEN - 1] != FRAME_MARKER {
            return Err(DomainError::protocol(format!(
                "bad frame markers 0x{:02X}/0x{:02X}",
                raw[0],
                raw[HEADER_LEN - 1]
            )));
        }

        let mut buf = raw;
        buf.advance(1);
        let command_code = buf.get_u8();
        let command = Command::from_code(command_code).ok_or_else(|| {
            DomainError::protocol(format!("unknown command 0x{:02X}", command_code))
        })?;
        let module_type = buf.get_u8();
        let address = buf.get_u8();
        buf.advance(2);
        let record_size = buf.get_u8();
        let record_count = buf.get_u8();

        Ok(Self {
            command,
            module_type,
            address,
            record_size,
            record_count,
        })
    }
}

/// Complete frame: header plus body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: Header,
    pub body: Bytes,
}

impl Frame {
    pub fn new(header: Header, body: Bytes) -> Self {
        Self { header, body }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.body.len());
        self.header.encode(&mut buf);
        buf.put_slice(&self.body);
        buf.freeze()
    }
}

pub fn list_modules_request() -> Frame {
    Frame::new(Header::new(Command::ListModules, ANY, ANY), Bytes::new())
}

pub fn list_outputs_request(module: &DiscoveredModule) -> Frame {
    Frame::new(
        Header::new(
            Command::ListOutputs,
            module_type_code(module.module_type),
            module.address,
        ),
        Bytes::new(),
    )
}

pub fn status_request(module_type: ModuleType, address: u8) -> Frame {
    Frame::new(
        Header::new(Command::Status, module_type_code(module_type), address),
        Bytes::new(),
    )
}

pub fn action_request(module_type: ModuleType, address: u8, index: u8, level: u8) -> Frame {
    let header = Header::new(Command::Action, module_type_code(module_type), address)
        .with_records(ACTION_RECORD_LEN as u8, 1);
    let body = Bytes::copy_from_slice(&[address, index, level, 0xFF, 0xFF, 0x64, 0xFF, 0xFF]);
    Frame::new(header, body)
}

pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<(), DomainError>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(&frame.encode())
        .await
        .map_err(|e| DomainError::connection(format!("write failed: {}", e)))?;
    writer
        .flush()
        .await
        .map_err(|e| DomainError::connection(format!("flush failed: {}", e)))
}

/// Read one frame. EOF is a connection error, a bad header a protocol error.
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame, DomainError>
where
    R: AsyncRead + Unpin,
{
    let mut raw = [0u8; HEADER_LEN];
    reader
        .read_exact(&mut raw)
        .await
        .map_err(|e| DomainError::connection(format!("reading header: {}", e)))?;
    let header = Header::decode(&raw)?;

    let mut body = vec![0u8; header.body_len()];
    reader
        .read_exact(&mut body)
        .await
        .map_err(|e| DomainError::connection(format!("reading body: {}", e)))?;

    Ok(Frame::new(header, Bytes::from(body)))
}

/// Check that a reply answers `expected` with records of `record_size` bytes.
pub fn expect_reply(
    frame: &Frame,
    expected: Command,
    record_size: Option<usize>,
) -> Result<(), DomainError> {
    if frame.header.command != expected {
        return Err(DomainError::protocol(format!(
            "expected {:?} reply, got {:?}",
            expected, frame.header.command
        )));
    }
    if let Some(size) = record_size {
        if frame.header.record_count > 0 && usize::from(frame.header.record_size) != size {
            return Err(DomainError::protocol(format!(
                "{:?} records must be {} bytes, got {}",
                expected, size, frame.header.record_size
            )));
        }
    }
    Ok(())
}

pub fn decode_modules(frame: &Frame) -> Result<Vec<DiscoveredModule>, DomainError> {
    expect_reply(frame, Command::ListModules, Some(MODULE_RECORD_LEN))?;
    frame
        .body
        .chunks_exact(MODULE_RECORD_LEN)
        .map(|record| {
            Ok(DiscoveredModule {
                address: record[0],
                module_type: module_type_from_code(record[1])?,
            })
        })
        .collect()
}

pub fn decode_outputs(address: u8, frame: &Frame) -> Result<Vec<Output>, DomainError> {
    expect_reply(frame, Command::ListOutputs, Some(OUTPUT_RECORD_LEN))?;
    if frame.header.record_count > 0 && frame.header.address != address {
        return Err(DomainError::protocol(format!(
            "outputs of module {} requested, module {} answered",
            address, frame.header.address
        )));
    }

    frame
        .body
        .chunks_exact(OUTPUT_RECORD_LEN)
        .map(|record| {
            Ok(Output::new(
                address,
                record[0],
                output_type_from_code(record[1])?,
                record[2],
                decode_name(&record[4..4 + OUTPUT_NAME_LEN]),
            ))
        })
        .collect()
}

/// Decode a status reply for a module with `output_count` outputs.
///
/// Channels past `output_count` are dropped unchecked; a short reply is
/// returned as-is for the caller to reject.
pub fn decode_levels(frame: &Frame, output_count: usize) -> Result<Vec<u8>, DomainError> {
    expect_reply(frame, Command::Status, Some(1))?;
    let levels = &frame.body[..frame.body.len().min(output_count)];
    if let Some(level) = levels.iter().find(|level| **level > 100) {
        return Err(DomainError::protocol(format!(
            "level {} out of range",
            level
        )));
    }
    Ok(levels.to_vec())
}

/// Names are fixed-width; padding may be NUL, space or 0xFF.
fn decode_name(raw: &[u8]) -> String {
    let end = raw
        .iter()
        .rposition(|&b| !matches!(b, 0x00 | 0x20 | 0xFF))
        .map_or(0, |pos| pos + 1);
    String::from_utf8_lossy(&raw[..end]).trim().to_string()
}

/// Encode a name into its fixed-width field, padding with NUL.
pub fn encode_name(name: &str) -> [u8; OUTPUT_NAME_LEN] {
    let mut field = [0u8; OUTPUT_NAME_LEN];
    let bytes = name.as_bytes();
    let len = bytes.len().min(OUTPUT_NAME_LEN);
    field[..len].copy_from_slice(&bytes[..len]);
    field
}

pub fn encode_module_records(modules: &[DiscoveredModule]) -> Frame {
    let mut body = BytesMut::with_capacity(modules.len() * MODULE_RECORD_LEN);
    for module in modules {
        body.put_u8(module.address);
        body.put_u8(module_type_code(module.module_type));
    }
    let header = Header::new(Command::ListModules, ANY, ANY)
        .with_records(MODULE_RECORD_LEN as u8, modules.len() as u8);
    Frame::new(header, body.freeze())
}

pub fn encode_output_records(module: &DiscoveredModule, outputs: &[Output]) -> Frame {
    let mut body = BytesMut::with_capacity(outputs.len() * OUTPUT_RECORD_LEN);
    for output in outputs {
        body.put_u8(output.index);
        body.put_u8(output_type_code(output.output_type));
        body.put_u8(output.group_index);
        body.put_u8(0);
        body.put_slice(&encode_name(&output.name));
    }
    let header = Header::new(
        Command::ListOutputs,
        module_type_code(module.module_type),
        module.address,
    )
    .with_records(OUTPUT_RECORD_LEN as u8, outputs.len() as u8);
    Frame::new(header, body.freeze())
}

pub fn encode_levels(module_type: ModuleType, address: u8, levels: &[u8]) -> Frame {
    let header = Header::new(Command::Status, module_type_code(module_type), address)
        .with_records(1, levels.len() as u8);
    Frame::new(header, Bytes::copy_from_slice(levels))
}

pub fn action_ack(module_type: ModuleType, address: u8) -> Frame {
    Frame::new(
        Header::new(Command::Action, module_type_code(module_type), address),
        Bytes::new(),
    )
}
