//! PCAP/PCAPNG file reader.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use pcap_parser::pcapng::Block;
use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{LegacyPcapReader, PcapBlockOwned, PcapError as ParseError, PcapNGReader};
use tracing::debug;

use super::packet::linktype;
use super::RawPacket;
use crate::error::PcapError;

/// Buffer size for reading capture files (64KB).
const BUFFER_SIZE: usize = 65536;

/// Largest parser buffer a single block may grow it to (16MB).
const MAX_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// Gzip magic bytes.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Container format, detected from the leading magic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcapFormat {
    /// Classic libpcap format
    Legacy { nanosecond: bool },
    /// PCAP next generation
    Ng,
}

impl PcapFormat {
    fn from_magic(magic: &[u8; 4]) -> Option<Self> {
        match magic {
            [0xd4, 0xc3, 0xb2, 0xa1] | [0xa1, 0xb2, 0xc3, 0xd4] => {
                Some(PcapFormat::Legacy { nanosecond: false })
            }
            [0x4d, 0x3c, 0xb2, 0xa1] | [0xa1, 0xb2, 0x3c, 0x4d] => {
                Some(PcapFormat::Legacy { nanosecond: true })
            }
            [0x0a, 0x0d, 0x0d, 0x0a] => Some(PcapFormat::Ng),
            _ => None,
        }
    }
}

/// Sequential reader over a capture file, with optional gzip decompression.
///
/// The link type is discovered while opening, so callers can compile
/// link-type dependent state (filters) before the first packet is read.
/// Once the end of the file or a parse error is reached, every further call
/// to [`PcapReader::next_packet`] returns `Ok(None)`.
///
/// The parser buffer starts at 64KB and doubles, up to 16MB, when a block
/// does not fit.
pub struct PcapReader {
    inner: Box<dyn PcapReaderIterator + Send>,
    buffer_size: usize,
    cursor: Cursor,
    /// Packet read ahead while discovering the link type.
    pending: Option<RawPacket>,
    exhausted: bool,
}

/// Per-file decoding state, kept apart from `inner` so blocks borrowed from
/// the parser buffer can be converted while the parser is borrowed.
struct Cursor {
    format: PcapFormat,
    frame_number: u64,
    /// Link type of a legacy file, or of the first PCAPNG interface.
    link_type: Option<u16>,
    /// PCAPNG link types indexed by interface id, reset at each section.
    interfaces: Vec<u16>,
}

impl Cursor {
    fn absorb(&mut self, block: PcapBlockOwned<'_>) -> Result<Option<RawPacket>, PcapError> {
        let packet = match block {
            PcapBlockOwned::LegacyHeader(header) => {
                self.link_type = Some(header.network.0 as u16);
                None
            }
            PcapBlockOwned::Legacy(packet) => {
                let fraction = packet.ts_usec as i64;
                let micros = match self.format {
                    PcapFormat::Legacy { nanosecond: true } => fraction / 1000,
                    _ => fraction,
                };
                let timestamp_us = (packet.ts_sec as i64) * 1_000_000 + micros;
                let link_type = self.link_type.unwrap_or(linktype::ETHERNET);
                Some(self.packet(
                    timestamp_us,
                    packet.origlen,
                    link_type,
                    clamp(packet.data, packet.caplen),
                ))
            }
            PcapBlockOwned::NG(Block::SectionHeader(_)) => {
                self.interfaces.clear();
                None
            }
            PcapBlockOwned::NG(Block::InterfaceDescription(idb)) => {
                let link_type = idb.linktype.0 as u16;
                self.interfaces.push(link_type);
                self.link_type.get_or_insert(link_type);
                None
            }
            PcapBlockOwned::NG(Block::EnhancedPacket(epb)) => {
                let link_type = self.interface(epb.if_id)?;
                // Interface time units, microseconds unless if_tsresol says otherwise
                let timestamp_us = ((epb.ts_high as i64) << 32) | (epb.ts_low as i64);
                Some(self.packet(
                    timestamp_us,
                    epb.origlen,
                    link_type,
                    clamp(epb.data, epb.caplen),
                ))
            }
            PcapBlockOwned::NG(Block::SimplePacket(spb)) => {
                // Simple packets always belong to the first interface
                let link_type = self.interface(0)?;
                Some(self.packet(0, spb.origlen, link_type, clamp(spb.data, spb.origlen)))
            }
            _ => None,
        };
        Ok(packet)
    }

    fn interface(&self, if_id: u32) -> Result<u16, PcapError> {
        self.interfaces
            .get(if_id as usize)
            .copied()
            .ok_or_else(|| invalid(format!("Packet references unknown interface {if_id}")))
    }

    fn packet(
        &mut self,
        timestamp_us: i64,
        original_length: u32,
        link_type: u16,
        data: &[u8],
    ) -> RawPacket {
        self.frame_number += 1;
        RawPacket::new(
            self.frame_number,
            timestamp_us,
            original_length,
            link_type,
            data.to_vec(),
        )
    }
}

/// Strip block padding beyond the captured length.
fn clamp(data: &[u8], len: u32) -> &[u8] {
    &data[..data.len().min(len as usize)]
}

impl PcapReader {
    /// Open a capture file for reading.
    ///
    /// Automatically detects and decompresses gzipped files.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PcapError> {
        let path = path.as_ref();
        let gzipped = is_gzip_file(path)?;

        let mut magic = [0u8; 4];
        open_stream(path, gzipped)?
            .read_exact(&mut magic)
            .map_err(|_| invalid("File too short to read magic number".to_string()))?;
        let format = PcapFormat::from_magic(&magic)
            .ok_or_else(|| invalid(format!("Unknown magic number: {magic:02x?}")))?;

        // The magic bytes were consumed; the parsers need them, so reopen.
        let stream = open_stream(path, gzipped)?;
        let inner: Box<dyn PcapReaderIterator + Send> = match format {
            PcapFormat::Legacy { .. } => Box::new(
                LegacyPcapReader::new(BUFFER_SIZE, stream)
                    .map_err(|e| invalid(format!("Failed to parse PCAP header: {e}")))?,
            ),
            PcapFormat::Ng => Box::new(
                PcapNGReader::new(BUFFER_SIZE, stream)
                    .map_err(|e| invalid(format!("Failed to parse PCAPNG header: {e}")))?,
            ),
        };

        let mut reader = Self {
            inner,
            buffer_size: BUFFER_SIZE,
            cursor: Cursor {
                format,
                frame_number: 0,
                link_type: None,
                interfaces: Vec::new(),
            },
            pending: None,
            exhausted: false,
        };
        reader.discover_link_type()?;
        Ok(reader)
    }

    /// Read blocks until the link type is known or a packet shows up first.
    fn discover_link_type(&mut self) -> Result<(), PcapError> {
        while self.cursor.link_type.is_none() && self.pending.is_none() && !self.exhausted {
            self.pending = self.step()?;
        }
        Ok(())
    }

    /// Get the link type of the capture.
    ///
    /// For PCAPNG this is the first interface's link type. Packets carry the
    /// link type of the interface they were captured on.
    pub fn link_type(&self) -> u16 {
        self.cursor.link_type.unwrap_or(linktype::ETHERNET)
    }

    /// Get the container format.
    pub fn format(&self) -> PcapFormat {
        self.cursor.format
    }

    /// Number of packets read so far (including one read ahead).
    pub fn frame_count(&self) -> u64 {
        self.cursor.frame_number
    }

    /// Read the next packet, `Ok(None)` once the file is exhausted.
    pub fn next_packet(&mut self) -> Result<Option<RawPacket>, PcapError> {
        if let Some(packet) = self.pending.take() {
            return Ok(Some(packet));
        }
        while !self.exhausted {
            if let Some(packet) = self.step()? {
                return Ok(Some(packet));
            }
        }
        Ok(None)
    }

    /// Consume one block. Yields a packet only for packet blocks.
    fn step(&mut self) -> Result<Option<RawPacket>, PcapError> {
        loop {
            match self.inner.next() {
                Ok((offset, block)) => {
                    let packet = self.cursor.absorb(block);
                    self.inner.consume(offset);
                    if packet.is_err() {
                        self.exhausted = true;
                    }
                    return packet;
                }
                Err(ParseError::Eof) => {
                    self.exhausted = true;
                    return Ok(None);
                }
                Err(ParseError::BufferTooSmall) => self.grow()?,
                Err(ParseError::Incomplete(_)) => match self.inner.refill() {
                    Ok(()) => {}
                    Err(ParseError::BufferTooSmall) => self.grow()?,
                    Err(e) => {
                        let reason = format!("Refill error: {e}");
                        self.exhausted = true;
                        return Err(invalid(reason));
                    }
                },
                Err(e) => {
                    let reason = format!("Parse error: {e}");
                    self.exhausted = true;
                    return Err(invalid(reason));
                }
            }
        }
    }

    /// Double the parser buffer so the next block fits.
    fn grow(&mut self) -> Result<(), PcapError> {
        let size = self.buffer_size * 2;
        if size > MAX_BUFFER_SIZE || !self.inner.grow(size) {
            self.exhausted = true;
            return Err(invalid(format!(
                "Block larger than the {MAX_BUFFER_SIZE} byte read buffer"
            )));
        }
        debug!(size, "grew capture read buffer");
        self.buffer_size = size;
        Ok(())
    }
}

fn invalid(reason: String) -> PcapError {
    PcapError::InvalidFormat { reason }
}

fn open_stream(path: &Path, gzipped: bool) -> Result<BufReader<Box<dyn Read + Send>>, PcapError> {
    let file = File::open(path).map_err(|_| PcapError::FileNotFound {
        path: path.display().to_string(),
    })?;
    let reader: Box<dyn Read + Send> = if gzipped {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(BufReader::with_capacity(BUFFER_SIZE, reader))
}

/// Check if a file is gzipped by extension or magic bytes.
fn is_gzip_file(path: &Path) -> Result<bool, PcapError> {
    if is_gzip_extension(path) {
        return Ok(true);
    }

    let mut file = File::open(path).map_err(|_| PcapError::FileNotFound {
        path: path.display().to_string(),
    })?;

    let mut magic = [0u8; 2];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == GZIP_MAGIC),
        Err(_) => Ok(false), // Too short to be gzipped
    }
}

/// Check if a path looks like a gzip file by extension only.
pub fn is_gzip_extension<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .file_name()
        .and_then(|f| f.to_str())
        .map(|name| name.to_lowercase().ends_with(".gz"))
        .unwrap_or(false)
}

impl Iterator for PcapReader {
    type Item = Result<RawPacket, PcapError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_packet().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcap::test_util::{ethernet_frame, legacy_pcap, pcapng, write_temp};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_detect_gzip_by_extension() {
        assert!(is_gzip_extension("test.pcap.gz"));
        assert!(is_gzip_extension("TEST.PCAP.GZ"));
        assert!(!is_gzip_extension("test.pcap"));
        assert!(!is_gzip_extension("test.pcapng"));
    }

    #[test]
    fn test_detect_gzip_by_magic_bytes() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(&GZIP_MAGIC).unwrap();
        temp.write_all(&[0x00, 0x00]).unwrap();
        temp.flush().unwrap();

        assert!(is_gzip_file(temp.path()).unwrap());
    }

    #[test]
    fn test_read_packets_in_order() {
        let frames = [ethernet_frame(0x01), ethernet_frame(0x02), ethernet_frame(0x03)];
        let temp = write_temp(&legacy_pcap(linktype::ETHERNET, &frames), ".pcap");

        let mut reader = PcapReader::open(temp.path()).unwrap();
        assert_eq!(reader.link_type(), linktype::ETHERNET);
        assert_eq!(reader.format(), PcapFormat::Legacy { nanosecond: false });

        for (i, frame) in frames.iter().enumerate() {
            let packet = reader.next_packet().unwrap().unwrap();
            assert_eq!(packet.frame_number, i as u64 + 1);
            assert_eq!(&packet.data, frame);
            assert_eq!(packet.original_length as usize, frame.len());
        }
        assert!(reader.next_packet().unwrap().is_none());
        assert!(reader.next_packet().unwrap().is_none());
    }

    #[test]
    fn test_link_type_known_before_first_packet() {
        let frames = [vec![0x45u8; 20]];
        let temp = write_temp(&legacy_pcap(linktype::RAW, &frames), ".pcap");

        let mut reader = PcapReader::open(temp.path()).unwrap();
        assert_eq!(reader.link_type(), linktype::RAW);

        let packet = reader.next_packet().unwrap().unwrap();
        assert_eq!(packet.link_type, linktype::RAW);
        assert_eq!(packet.frame_number, 1);
    }

    #[test]
    fn test_empty_capture() {
        let temp = write_temp(&legacy_pcap(linktype::ETHERNET, &[]), ".pcap");
        let mut reader = PcapReader::open(temp.path()).unwrap();
        assert!(reader.next_packet().unwrap().is_none());
        assert_eq!(reader.frame_count(), 0);
    }

    #[test]
    fn test_create_and_read_gzip_pcap() {
        let pcap_data = legacy_pcap(linktype::ETHERNET, &[ethernet_frame(0x07)]);

        let temp = NamedTempFile::with_suffix(".pcap.gz").unwrap();
        {
            let file = File::create(temp.path()).unwrap();
            let mut encoder = GzEncoder::new(file, Compression::default());
            encoder.write_all(&pcap_data).unwrap();
            encoder.finish().unwrap();
        }

        let reader = PcapReader::open(temp.path()).unwrap();
        assert_eq!(reader.count(), 1);
    }

    #[test]
    fn test_frame_larger_than_initial_buffer() {
        let jumbo = vec![0xab; 70_000];
        let temp = write_temp(&legacy_pcap(linktype::ETHERNET, &[jumbo.clone()]), ".pcap");

        let mut reader = PcapReader::open(temp.path()).unwrap();
        let packet = reader.next_packet().unwrap().unwrap();
        assert_eq!(packet.data, jumbo);
        assert_eq!(packet.original_length, 70_000);
        assert!(reader.next_packet().unwrap().is_none());
    }

    #[test]
    fn test_pcapng_packets_carry_interface_link_type() {
        let raw_ip = vec![0x45u8; 20];
        let packets = [
            (0, ethernet_frame(0x01)),
            (1, raw_ip.clone()),
            (0, ethernet_frame(0x02)),
        ];
        let temp = write_temp(&pcapng(&[linktype::ETHERNET, linktype::RAW], &packets), ".pcapng");

        let mut reader = PcapReader::open(temp.path()).unwrap();
        assert_eq!(reader.format(), PcapFormat::Ng);
        assert_eq!(reader.link_type(), linktype::ETHERNET);

        let link_types: Vec<u16> = reader.by_ref().map(|p| p.unwrap().link_type).collect();
        assert_eq!(
            link_types,
            vec![linktype::ETHERNET, linktype::RAW, linktype::ETHERNET]
        );
    }

    #[test]
    fn test_pcapng_unknown_interface_ends_the_file() {
        let packets = [(0, ethernet_frame(0x01)), (3, ethernet_frame(0x02))];
        let temp = write_temp(&pcapng(&[linktype::ETHERNET], &packets), ".pcapng");

        let mut reader = PcapReader::open(temp.path()).unwrap();
        assert!(reader.next_packet().unwrap().is_some());
        let err = reader.next_packet().unwrap_err();
        assert!(matches!(err, PcapError::InvalidFormat { .. }));
        assert!(reader.next_packet().unwrap().is_none());
    }

    #[test]
    fn test_unknown_magic() {
        let temp = write_temp(b"not a capture file", ".pcap");
        let err = PcapReader::open(temp.path()).err().unwrap();
        assert!(matches!(err, PcapError::InvalidFormat { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = PcapReader::open("/nonexistent/capture.pcap").err().unwrap();
        assert!(matches!(err, PcapError::FileNotFound { .. }));
    }
}
