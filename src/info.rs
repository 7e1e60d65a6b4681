//! Text dump support shared by all boxes.

use crate::boxes::{FourCC, FullBoxHeader, Mp4Box};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::io;
use std::str::FromStr;

/// Per-box-type verbosity, parsed from selectors like `"all:1,trun:2"`.
///
/// `all` sets the level for every type not listed explicitly. Unlisted types
/// default to level 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoLevels {
    all: u32,
    specific: HashMap<FourCC, u32>,
}

impl InfoLevels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_all(mut self, level: u32) -> Self {
        self.all = level;
        self
    }

    pub fn with_level(mut self, typ: FourCC, level: u32) -> Self {
        self.specific.insert(typ, level);
        self
    }

    pub fn level(&self, typ: FourCC) -> u32 {
        self.specific.get(&typ).copied().unwrap_or(self.all)
    }
}

impl FromStr for InfoLevels {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut levels = InfoLevels::default();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let bad = || Error::InvalidInfoLevels(part.to_string());
            let (name, level) = part.split_once(':').ok_or_else(bad)?;
            let level: u32 = level.trim().parse().map_err(|_| bad())?;
            if name == "all" {
                levels.all = level;
                continue;
            }
            // tags may have trailing spaces, e.g. "url "
            let padded = format!("{name:<4}");
            let typ = FourCC::from_str(&padded).ok_or_else(bad)?;
            levels.specific.insert(typ, level);
        }
        Ok(levels)
    }
}

/// Write the `[type] size=N` line and return the level selected for this box.
pub fn write_box_line(
    w: &mut dyn io::Write,
    b: &dyn Mp4Box,
    levels: &InfoLevels,
    indent: &str,
) -> Result<u32> {
    writeln!(w, "{indent}[{}] size={}", b.box_type(), b.size())?;
    Ok(levels.level(b.box_type()))
}

/// Like [`write_box_line`] but also prints version and flags.
pub fn write_full_box_line(
    w: &mut dyn io::Write,
    b: &dyn Mp4Box,
    fb: FullBoxHeader,
    levels: &InfoLevels,
    indent: &str,
) -> Result<u32> {
    writeln!(
        w,
        "{indent}[{}] size={} version={} flags={:06x}",
        b.box_type(),
        b.size(),
        fb.version,
        fb.flags
    )?;
    Ok(levels.level(b.box_type()))
}

pub fn write_children_info(
    w: &mut dyn io::Write,
    children: &[Box<dyn Mp4Box>],
    levels: &InfoLevels,
    indent: &str,
    indent_step: &str,
) -> Result<()> {
    let child_indent = format!("{indent}{indent_step}");
    for c in children {
        c.info(w, levels, &child_indent, indent_step)?;
    }
    Ok(())
}
