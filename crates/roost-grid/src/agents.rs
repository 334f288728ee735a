//! Fixed-stride agent records and their read/write double buffer.
//!
//! An agent record is `stride` consecutive `f32` words. Roost only looks
//! at the three words starting at `position_offset`; the rest of the
//! record (velocity, state, ids) is copied verbatim.
//!
//! [`AgentBuffers`] holds two equally sized buffers in ping-pong. During a
//! frame the behaviour kernels and the grid read one and write the
//! other; [`AgentBuffers::swap`] exchanges the roles.

use glam::Vec3;
use roost_core::capacity::pow2_capacity;
use roost_core::CapacityError;

use crate::error::GridError;

/// Shape of one agent record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgentLayout {
    stride: usize,
    position_offset: usize,
}

impl AgentLayout {
    /// Records holding nothing but a position.
    pub const POSITION_ONLY: Self = Self {
        stride: 3,
        position_offset: 0,
    };

    /// A layout of `stride` words with the position at `position_offset`.
    pub fn new(stride: usize, position_offset: usize) -> Result<Self, GridError> {
        let fits = position_offset
            .checked_add(3)
            .is_some_and(|end| end <= stride);
        if !fits {
            return Err(GridError::InvalidLayout {
                stride,
                position_offset,
            });
        }
        Ok(Self {
            stride,
            position_offset,
        })
    }

    /// Words per record.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Word offset of the position.
    pub fn position_offset(&self) -> usize {
        self.position_offset
    }

    /// Position stored in `record`.
    pub fn position(&self, record: &[f32]) -> Vec3 {
        let o = self.position_offset;
        Vec3::new(record[o], record[o + 1], record[o + 2])
    }

    /// Overwrite the position stored in `record`.
    pub fn set_position(&self, record: &mut [f32], position: Vec3) {
        let o = self.position_offset;
        record[o..o + 3].copy_from_slice(&position.to_array());
    }
}

/// A buffer of agent records.
///
/// Storage is grown to a power-of-two record capacity and never shrinks.
/// Records past [`len`](Self::len) are left as they were.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentBuffer {
    layout: AgentLayout,
    len: usize,
    data: Vec<f32>,
}

impl AgentBuffer {
    /// A zeroed buffer of `len` records.
    pub fn new(layout: AgentLayout, len: usize) -> Result<Self, GridError> {
        let mut buffer = Self {
            layout,
            len: 0,
            data: Vec::new(),
        };
        buffer.resize(len)?;
        Ok(buffer)
    }

    /// A position-only buffer holding `positions`.
    pub fn from_positions(positions: &[Vec3]) -> Result<Self, GridError> {
        let mut buffer = Self::new(AgentLayout::POSITION_ONLY, positions.len())?;
        for (i, p) in positions.iter().enumerate() {
            buffer.set_position(i, *p);
        }
        Ok(buffer)
    }

    /// Change the record count, growing storage if needed.
    ///
    /// Returns `true` if the storage grew.
    pub fn resize(&mut self, len: usize) -> Result<bool, GridError> {
        let stride = self.layout.stride;
        let overflow = CapacityError::Overflow { requested: len };
        let needed = len.checked_mul(stride).ok_or(overflow.clone())?;
        let grew = if needed > self.data.len() {
            let words = pow2_capacity(len)?
                .checked_mul(stride)
                .ok_or(overflow)?;
            self.data.resize(words, 0.0);
            true
        } else {
            false
        };
        self.len = len;
        Ok(grew)
    }

    /// The record layout.
    pub fn layout(&self) -> AgentLayout {
        self.layout
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether there are no records.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Records the storage can hold without growing.
    pub fn capacity(&self) -> usize {
        self.data.len() / self.layout.stride
    }

    /// Record `index`.
    ///
    /// # Panics
    ///
    /// If `index >= len()`.
    pub fn record(&self, index: usize) -> &[f32] {
        assert!(index < self.len, "record {index} out of range for {} agents", self.len);
        let s = self.layout.stride;
        &self.data[index * s..(index + 1) * s]
    }

    /// Mutable record `index`.
    ///
    /// # Panics
    ///
    /// If `index >= len()`.
    pub fn record_mut(&mut self, index: usize) -> &mut [f32] {
        assert!(index < self.len, "record {index} out of range for {} agents", self.len);
        let s = self.layout.stride;
        &mut self.data[index * s..(index + 1) * s]
    }

    /// Position of record `index`.
    pub fn position(&self, index: usize) -> Vec3 {
        self.layout.position(self.record(index))
    }

    /// Overwrite the position of record `index`.
    pub fn set_position(&mut self, index: usize, position: Vec3) {
        let layout = self.layout;
        layout.set_position(self.record_mut(index), position);
    }

    /// All `len()` records as one slice.
    pub fn records(&self) -> &[f32] {
        &self.data[..self.len * self.layout.stride]
    }

    /// All `len()` records as one mutable slice.
    pub fn records_mut(&mut self) -> &mut [f32] {
        &mut self.data[..self.len * self.layout.stride]
    }

    /// The records as raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.records())
    }
}

/// Two agent buffers in ping-pong.
///
/// ```text
/// frame n:   read = A   write = B   -> swap
/// frame n+1: read = B   write = A   -> swap
/// ```
#[derive(Clone, Debug)]
pub struct AgentBuffers {
    buffer_a: AgentBuffer,
    buffer_b: AgentBuffer,
    /// When true, B is the read buffer and A the write buffer.
    b_is_read: bool,
    swaps: u64,
}

impl AgentBuffers {
    /// Two zeroed buffers of `len` records.
    pub fn new(layout: AgentLayout, len: usize) -> Result<Self, GridError> {
        let buffer = AgentBuffer::new(layout, len)?;
        Ok(Self::from_buffer(buffer))
    }

    /// Start from `initial` as the read buffer; the write buffer is a copy.
    pub fn from_buffer(initial: AgentBuffer) -> Self {
        Self {
            buffer_b: initial.clone(),
            buffer_a: initial,
            b_is_read: false,
            swaps: 0,
        }
    }

    /// The buffer holding the current agent state.
    pub fn read(&self) -> &AgentBuffer {
        if self.b_is_read {
            &self.buffer_b
        } else {
            &self.buffer_a
        }
    }

    /// Mutable records of the read buffer, for seeding agents.
    pub fn read_mut(&mut self) -> AgentRecordsMut<'_> {
        AgentRecordsMut {
            buffer: if self.b_is_read {
                &mut self.buffer_b
            } else {
                &mut self.buffer_a
            },
        }
    }

    /// The buffer the current pass writes to.
    pub fn write(&self) -> &AgentBuffer {
        if self.b_is_read {
            &self.buffer_a
        } else {
            &self.buffer_b
        }
    }

    /// Mutable records of the write buffer.
    pub fn write_mut(&mut self) -> AgentRecordsMut<'_> {
        AgentRecordsMut {
            buffer: if self.b_is_read {
                &mut self.buffer_a
            } else {
                &mut self.buffer_b
            },
        }
    }

    /// Borrow the read buffer and the write records together.
    pub fn split(&mut self) -> (&AgentBuffer, AgentRecordsMut<'_>) {
        let (read, write) = if self.b_is_read {
            (&self.buffer_b, &mut self.buffer_a)
        } else {
            (&self.buffer_a, &mut self.buffer_b)
        };
        (read, AgentRecordsMut { buffer: write })
    }

    /// Exchange the read and write roles.
    pub fn swap(&mut self) {
        self.b_is_read = !self.b_is_read;
        self.swaps += 1;
    }

    /// Number of swaps so far.
    pub fn swaps(&self) -> u64 {
        self.swaps
    }

    /// Record count of both buffers.
    pub fn len(&self) -> usize {
        self.buffer_a.len()
    }

    /// Whether both buffers are empty.
    pub fn is_empty(&self) -> bool {
        self.buffer_a.is_empty()
    }

    /// The record layout shared by both buffers.
    pub fn layout(&self) -> AgentLayout {
        self.buffer_a.layout()
    }

    /// Resize both buffers. Returns `true` if storage grew.
    pub fn resize(&mut self, len: usize) -> Result<bool, GridError> {
        let a = self.buffer_a.resize(len)?;
        let b = self.buffer_b.resize(len)?;
        Ok(a || b)
    }
}

/// Record-level write access to one side of an [`AgentBuffers`] pair.
///
/// The record count can only change through [`AgentBuffers::resize`],
/// which keeps both sides the same length.
#[derive(Debug)]
pub struct AgentRecordsMut<'a> {
    buffer: &'a mut AgentBuffer,
}

impl AgentRecordsMut<'_> {
    /// The record layout.
    pub fn layout(&self) -> AgentLayout {
        self.buffer.layout()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether there are no records.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Record `index`.
    pub fn record(&self, index: usize) -> &[f32] {
        self.buffer.record(index)
    }

    /// Mutable record `index`.
    pub fn record_mut(&mut self, index: usize) -> &mut [f32] {
        self.buffer.record_mut(index)
    }

    /// Position of record `index`.
    pub fn position(&self, index: usize) -> Vec3 {
        self.buffer.position(index)
    }

    /// Overwrite the position of record `index`.
    pub fn set_position(&mut self, index: usize, position: Vec3) {
        self.buffer.set_position(index, position);
    }

    /// All records as one mutable slice.
    pub fn records_mut(&mut self) -> &mut [f32] {
        self.buffer.records_mut()
    }
}
