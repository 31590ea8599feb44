//! Workstation-side transports: scan-code byte feeds standing in for the
//! keyboard UART, and the packet sink standing in for the SPI peripheral.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, trace};

use crate::machine::assembler::ScanIrq;
use crate::machine::io::SpiLink;

/// Pacing for capture replay. The mailbox is depth 1, so a replayed capture
/// has to arrive at keyboard-like speed or most frames get dropped.
const REPLAY_BYTE_GAP: Duration = Duration::from_millis(2);

/// Where raw scan-code bytes come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FeedConfig {
    /// Raw bytes from stdin
    #[default]
    Stdin,
    /// Raw bytes from a pipe or character device
    Pipe(PathBuf),
    /// Paced replay of a capture file
    Replay(PathBuf),
}

impl FeedConfig {
    pub fn from_args(stdin: bool, pipe: Option<PathBuf>, replay: Option<PathBuf>) -> Option<Self> {
        if let Some(path) = replay {
            Some(FeedConfig::Replay(path))
        } else if let Some(path) = pipe {
            Some(FeedConfig::Pipe(path))
        } else if stdin {
            Some(FeedConfig::Stdin)
        } else {
            None
        }
    }
}

/// Spawn the byte-arrival thread. Each received byte is handed to the
/// interrupt-side handler, exactly as the RX interrupt would.
pub fn connect_feed(config: FeedConfig, mut irq: ScanIrq) -> io::Result<JoinHandle<()>> {
    match config {
        FeedConfig::Stdin => {
            info!("Reading scan codes from stdin");
            Ok(thread::spawn(move || {
                let mut stdin = io::stdin().lock();
                let mut buf = [0; 1];
                loop {
                    match stdin.read(&mut buf) {
                        Ok(1) => irq.on_byte(buf[0]),
                        _ => break,
                    }
                }
                trace!("stdin feed thread exited");
            }))
        }
        FeedConfig::Pipe(path) => {
            info!("Reading scan codes from {:?}", path);
            debug!("Opening {:?} as read", path);
            let mut pipe = OpenOptions::new().read(true).open(&path)?;
            debug!("Opened!");
            Ok(thread::spawn(move || {
                let mut buf = [0; 1];
                loop {
                    match pipe.read(&mut buf) {
                        Ok(1) => irq.on_byte(buf[0]),
                        _ => break,
                    }
                }
                trace!("pipe feed thread exited");
            }))
        }
        FeedConfig::Replay(path) => {
            info!("Replaying scan codes from {:?}", path);
            let bytes = std::fs::read(&path)?;
            Ok(thread::spawn(move || {
                for b in bytes {
                    irq.on_byte(b);
                    thread::sleep(REPLAY_BYTE_GAP);
                }
                trace!("replay feed thread exited");
            }))
        }
    }
}

/// Outgoing link: logs every transaction and optionally mirrors each word to
/// a pipe or file.
pub struct PacketSink {
    pipe: Option<File>,
    words_sent: usize,
}

impl PacketSink {
    pub fn open(out: Option<PathBuf>) -> io::Result<Self> {
        let pipe = match out {
            Some(path) => {
                info!("Writing packets to {:?}", path);
                Some(OpenOptions::new().create(true).append(true).open(&path)?)
            }
            None => None,
        };
        Ok(Self {
            pipe,
            words_sent: 0,
        })
    }

    pub fn words_sent(&self) -> usize {
        self.words_sent
    }
}

impl SpiLink for PacketSink {
    fn assert_select(&mut self) {
        trace!("CS asserted");
    }

    fn release_select(&mut self) {
        trace!("CS released");
    }

    fn exchange(&mut self, byte: u8) -> u8 {
        debug!("packet {byte:02X} ({byte:08b})");
        self.words_sent += 1;
        if let Some(pipe) = &mut self.pipe {
            if let Err(e) = pipe.write_all(&[byte]).and_then(|_| pipe.flush()) {
                error!("packet write failed: {e}");
                self.pipe = None;
            }
        }
        // Nothing meaningful comes back on the host
        0
    }
}
