// transcript-core - Binary unit format for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The compiled-unit file format.
//!
//! Little-endian 16-bit words except where noted. A fixed header (two magic
//! words, a version, and nine counts) is followed by NUL-terminated global
//! names, NUL-terminated accessor names, the concatenated code words,
//! per-block lengths, constant-index arrays for each payload kind, the
//! string/int/float payloads (ints are i64, floats are IEEE 754 doubles),
//! the skeleton slot descriptors (three words per slot: `vis<<8 | kind`,
//! accessor index, next index), per-skeleton slot counts, and the skeleton
//! class names.
//!
//! Loading never mutates shared state: it either produces a fresh unit or
//! reports why it cannot. A wrong magic or version is `NotAUnit` so that
//! callers can fall back to source compilation.

use std::fmt;
use std::rc::Rc;

use crate::class::{Skeleton, SlotKind, SlotSpec, SlotVis};
use crate::unit::Unit;
use crate::value::{Payload, Value};

const MAGIC1: u16 = 0x4200;
const MAGIC2: u16 = 0x4353;
const VERSION: u16 = 0;

/// Why a byte stream failed to load as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Wrong magic or version; the stream is something else entirely.
    NotAUnit,
    /// The stream ended inside a structure.
    Truncated,
    /// A count or index is inconsistent with the rest of the stream.
    Malformed(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::NotAUnit => write!(f, "not a compiled unit"),
            LoadError::Truncated => write!(f, "truncated unit"),
            LoadError::Malformed(msg) => write!(f, "malformed unit: {msg}"),
        }
    }
}

impl std::error::Error for LoadError {}

// ============================================================================
// Writing
// ============================================================================

impl Unit {
    /// Serialise the unit.
    pub fn save(&self) -> Vec<u8> {
        let blocks = self.blocks_snapshot();
        let consts = self.consts_snapshot();
        let global_names = self.global_names();
        let accessor_names = self.accessor_names();

        // classify the constant pool (indices 0..2 are canonical)
        let mut string_ps = Vec::new();
        let mut strings: Vec<&str> = Vec::new();
        let mut int_ps = Vec::new();
        let mut ints = Vec::new();
        let mut float_ps = Vec::new();
        let mut floats = Vec::new();
        let mut skeleton_ps = Vec::new();
        let mut skeletons: Vec<&Rc<Skeleton>> = Vec::new();
        let mut skeleton_size = 0usize;
        for (i, v) in consts.iter().enumerate().skip(3) {
            match v.payload() {
                Payload::Str(s) => {
                    string_ps.push(i as u16);
                    strings.push(s);
                }
                Payload::Int(n) => {
                    int_ps.push(i as u16);
                    ints.push(*n);
                }
                Payload::Float(f) => {
                    float_ps.push(i as u16);
                    floats.push(*f);
                }
                Payload::Skeleton(sk) => {
                    skeleton_ps.push(i as u16);
                    skeleton_size += sk.slots.len() * 3;
                    skeletons.push(sk);
                }
                _ => {}
            }
        }

        let code_len: usize = blocks.iter().map(|b| b.len()).sum();
        let mut out = Vec::new();

        // header
        for w in [
            MAGIC1,
            MAGIC2,
            VERSION,
            global_names.len() as u16,
            accessor_names.len() as u16,
            blocks.len() as u16,
            code_len as u16,
            strings.len() as u16,
            ints.len() as u16,
            floats.len() as u16,
            skeletons.len() as u16,
            skeleton_size as u16,
        ] {
            out.extend_from_slice(&w.to_le_bytes());
        }

        // names
        for n in &global_names {
            write_cstr(&mut out, n);
        }
        for n in &accessor_names {
            write_cstr(&mut out, n);
        }

        // code and block lengths
        for b in &blocks {
            for w in b.iter() {
                out.extend_from_slice(&w.to_le_bytes());
            }
        }
        for b in &blocks {
            out.extend_from_slice(&(b.len() as u16).to_le_bytes());
        }

        // constant locations and payloads
        for ps in [&string_ps, &int_ps, &float_ps, &skeleton_ps] {
            for p in ps.iter() {
                out.extend_from_slice(&p.to_le_bytes());
            }
        }
        for s in &strings {
            write_cstr(&mut out, s);
        }
        for n in &ints {
            out.extend_from_slice(&n.to_le_bytes());
        }
        for f in &floats {
            out.extend_from_slice(&f.to_le_bytes());
        }

        // skeletons
        for sk in &skeletons {
            for s in &sk.slots {
                let desc = (s.vis.to_u16() << 8) | s.kind.to_u16();
                out.extend_from_slice(&desc.to_le_bytes());
                out.extend_from_slice(&s.access.to_le_bytes());
                out.extend_from_slice(&s.next.to_le_bytes());
            }
        }
        for sk in &skeletons {
            out.extend_from_slice(&(sk.slots.len() as u16).to_le_bytes());
        }
        for sk in &skeletons {
            write_cstr(&mut out, &sk.name);
        }

        out
    }
}

fn write_cstr(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(s.as_bytes());
    out.push(0);
}

// ============================================================================
// Reading
// ============================================================================

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], LoadError> {
        if self.pos + n > self.bytes.len() {
            return Err(LoadError::Truncated);
        }
        let s = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    fn u16(&mut self) -> Result<u16, LoadError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn words(&mut self, n: usize) -> Result<Vec<u16>, LoadError> {
        let b = self.take(n * 2)?;
        Ok(b.chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect())
    }

    fn i64(&mut self) -> Result<i64, LoadError> {
        let b = self.take(8)?;
        Ok(i64::from_le_bytes(b.try_into().expect("8 bytes")))
    }

    fn f64(&mut self) -> Result<f64, LoadError> {
        let b = self.take(8)?;
        Ok(f64::from_le_bytes(b.try_into().expect("8 bytes")))
    }

    fn cstr(&mut self) -> Result<String, LoadError> {
        let start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos] != 0 {
            self.pos += 1;
        }
        if self.pos >= self.bytes.len() {
            return Err(LoadError::Truncated);
        }
        let s = String::from_utf8(self.bytes[start..self.pos].to_vec())
            .map_err(|_| LoadError::Malformed("name is not UTF-8".into()))?;
        self.pos += 1;
        Ok(s)
    }
}

impl Unit {
    /// Load a unit from its serialised form.
    pub fn load(bytes: &[u8]) -> Result<Unit, LoadError> {
        let mut r = Reader { bytes, pos: 0 };

        // header
        let header = r.words(12).map_err(|_| LoadError::NotAUnit)?;
        if header[0] != MAGIC1 || header[1] != MAGIC2 || header[2] != VERSION {
            return Err(LoadError::NotAUnit);
        }
        let globals = header[3] as usize;
        let accessors = header[4] as usize;
        let blocks = header[5] as usize;
        let code = header[6] as usize;
        let strings = header[7] as usize;
        let ints = header[8] as usize;
        let floats = header[9] as usize;
        let skeletons = header[10] as usize;
        let skeleton_size = header[11] as usize;
        let values = strings + ints + floats + skeletons;

        // names
        let mut global_names = Vec::with_capacity(globals);
        for _ in 0..globals {
            global_names.push(r.cstr()?);
        }
        let mut accessor_names = Vec::with_capacity(accessors);
        for _ in 0..accessors {
            accessor_names.push(r.cstr()?);
        }

        // code blocks
        let cbuf = r.words(code)?;
        let clens = r.words(blocks)?;
        let mut block_list = Vec::with_capacity(blocks);
        let mut p = 0usize;
        for len in &clens {
            let n = p + *len as usize;
            if n > cbuf.len() {
                return Err(LoadError::Malformed("block lengths exceed code".into()));
            }
            block_list.push(cbuf[p..n].to_vec());
            p = n;
        }
        if block_list.is_empty() {
            return Err(LoadError::Malformed("no top-level block".into()));
        }

        // constants
        let mut consts = vec![Value::nil(); values + 3];
        consts[0] = Value::nil();
        consts[1] = Value::bool_of(true);
        consts[2] = Value::bool_of(false);
        let vlocs = r.words(values)?;
        let place = |consts: &mut Vec<Value>, loc: u16, v: Value| -> Result<(), LoadError> {
            let i = loc as usize;
            if i < 3 || i >= consts.len() {
                return Err(LoadError::Malformed(format!("bad constant location {i}")));
            }
            consts[i] = v;
            Ok(())
        };
        let mut p = 0usize;
        for i in 0..strings {
            let s = r.cstr()?;
            place(&mut consts, vlocs[p + i], Value::str(s))?;
        }
        p += strings;
        for i in 0..ints {
            let n = r.i64()?;
            place(&mut consts, vlocs[p + i], Value::int(n))?;
        }
        p += ints;
        for i in 0..floats {
            let x = r.f64()?;
            place(&mut consts, vlocs[p + i], Value::float(x))?;
        }
        p += floats;

        // skeletons
        let sbuf = r.words(skeleton_size)?;
        let slens = r.words(skeletons)?;
        let mut soff = 0usize;
        let mut skels = Vec::with_capacity(skeletons);
        for len in &slens {
            let l = *len as usize;
            if soff + 3 * l > sbuf.len() {
                return Err(LoadError::Malformed("skeleton sizes exceed payload".into()));
            }
            let mut slots = Vec::with_capacity(l);
            for j in 0..l {
                let desc = sbuf[soff + 3 * j];
                let kind = SlotKind::from_u16(desc & 0xff)
                    .ok_or_else(|| LoadError::Malformed(format!("bad slot kind {}", desc & 0xff)))?;
                let vis = SlotVis::from_u16(desc >> 8)
                    .ok_or_else(|| LoadError::Malformed(format!("bad slot visibility {}", desc >> 8)))?;
                slots.push(SlotSpec {
                    kind,
                    vis,
                    access: sbuf[soff + 3 * j + 1],
                    next: sbuf[soff + 3 * j + 2],
                });
            }
            soff += 3 * l;
            skels.push(slots);
        }
        for (i, slots) in skels.into_iter().enumerate() {
            let name = r.cstr()?;
            let sk = Rc::new(Skeleton { name, slots });
            place(&mut consts, vlocs[p + i], Value::skeleton(sk))?;
        }

        Ok(Unit::from_parts(
            block_list,
            consts,
            global_names,
            accessor_names,
        ))
    }
}
