//! Recording test doubles for the transport traits

use crate::error::{Error, Result};
use crate::transport::{ControlLine, SpiTransport};
use core::cell::RefCell;
use std::collections::VecDeque;
use std::vec::Vec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Cs,
    Enable,
    WriteProtect,
    Hold,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Set(Line),
    Clear(Line),
    Write(Vec<u8>),
    Read(usize),
}

/// Bytes written and read between one CS assert and the matching deassert
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    pub written: Vec<u8>,
    pub read: usize,
}

/// Split an event log into chip-select frames
pub fn frames(events: &[Event]) -> Vec<Frame> {
    let mut frames = Vec::new();
    let mut current: Option<Frame> = None;
    for event in events {
        match event {
            Event::Clear(Line::Cs) => current = Some(Frame::default()),
            Event::Set(Line::Cs) => {
                if let Some(frame) = current.take() {
                    frames.push(frame);
                }
            }
            Event::Write(data) => {
                if let Some(frame) = current.as_mut() {
                    frame.written.extend_from_slice(data);
                }
            }
            Event::Read(len) => {
                if let Some(frame) = current.as_mut() {
                    frame.read += len;
                }
            }
            _ => {}
        }
    }
    frames
}

pub struct MockSpi<'a> {
    log: &'a RefCell<Vec<Event>>,
    responses: VecDeque<u8>,
    fail: bool,
    max_read_len: usize,
}

impl<'a> MockSpi<'a> {
    pub fn new(log: &'a RefCell<Vec<Event>>) -> Self {
        Self {
            log,
            responses: VecDeque::new(),
            fail: false,
            max_read_len: usize::MAX,
        }
    }

    pub fn failing(log: &'a RefCell<Vec<Event>>) -> Self {
        Self {
            fail: true,
            ..Self::new(log)
        }
    }

    /// Queue bytes handed out by subsequent reads; reads past the end get 0x00
    pub fn with_response(mut self, bytes: &[u8]) -> Self {
        self.responses.extend(bytes.iter().copied());
        self
    }

    pub fn with_max_read_len(mut self, len: usize) -> Self {
        self.max_read_len = len;
        self
    }
}

impl SpiTransport for MockSpi<'_> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.fail {
            return Err(Error::SpiTransferFailed);
        }
        self.log.borrow_mut().push(Event::Write(data.to_vec()));
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.fail {
            return Err(Error::SpiTransferFailed);
        }
        for byte in buf.iter_mut() {
            *byte = self.responses.pop_front().unwrap_or(0);
        }
        self.log.borrow_mut().push(Event::Read(buf.len()));
        Ok(())
    }

    fn max_read_len(&self) -> usize {
        self.max_read_len
    }
}

pub struct MockLine<'a> {
    line: Line,
    log: &'a RefCell<Vec<Event>>,
    fail: bool,
}

impl<'a> MockLine<'a> {
    pub fn new(line: Line, log: &'a RefCell<Vec<Event>>) -> Self {
        Self {
            line,
            log,
            fail: false,
        }
    }

    pub fn failing(line: Line, log: &'a RefCell<Vec<Event>>) -> Self {
        Self {
            line,
            log,
            fail: true,
        }
    }
}

impl ControlLine for MockLine<'_> {
    fn set(&mut self) -> Result<()> {
        if self.fail {
            return Err(Error::ControlLineFailed);
        }
        self.log.borrow_mut().push(Event::Set(self.line));
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        if self.fail {
            return Err(Error::ControlLineFailed);
        }
        self.log.borrow_mut().push(Event::Clear(self.line));
        Ok(())
    }
}
