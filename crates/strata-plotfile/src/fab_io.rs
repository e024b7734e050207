//! On-disk record for a single FAB.
//!
//! A record is one text line `FAB <box> <ncomp>` followed by the values,
//! component-major, as little-endian `f64`.

use std::io::{self, BufRead, Write};

use strata_core::IndexBox;
use strata_grid::Fab;

const TAG: &str = "FAB";

/// Write `fab` as one record, returning the bytes written.
pub fn write_fab(w: &mut dyn Write, fab: &Fab) -> io::Result<u64> {
    let line = format!("{TAG} {} {}\n", fab.bx(), fab.ncomp());
    w.write_all(line.as_bytes())?;
    for v in fab.data() {
        w.write_all(&v.to_le_bytes())?;
    }
    Ok((line.len() + fab.data().len() * 8) as u64)
}

/// Read one record.
pub fn read_fab(r: &mut dyn BufRead) -> io::Result<Fab> {
    let mut line = String::new();
    r.read_line(&mut line)?;
    let rest = line
        .trim_end()
        .strip_prefix(TAG)
        .ok_or_else(|| invalid(format!("expected '{TAG}' record, found '{}'", line.trim_end())))?;
    let (bx, ncomp) = rest
        .trim()
        .rsplit_once(' ')
        .ok_or_else(|| invalid(format!("record header '{}' lacks a component count", line.trim_end())))?;
    let bx: IndexBox = bx.parse().map_err(invalid)?;
    let ncomp: usize = ncomp
        .parse()
        .map_err(|e| invalid(format!("bad component count '{ncomp}': {e}")))?;
    let mut fab = Fab::new(bx, ncomp);
    let mut buf = [0u8; 8];
    for c in 0..ncomp {
        for v in fab.comp_mut(c) {
            r.read_exact(&mut buf)?;
            *v = f64::from_le_bytes(buf);
        }
    }
    Ok(fab)
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Seek, SeekFrom};
    use strata_core::{IndexType, IntVect};

    #[test]
    fn records_are_self_delimiting() {
        let mut a = Fab::new(IndexBox::new(IntVect::zero(), IntVect::new([1, 2, 0])), 2);
        a.comp_mut(1).fill(-1.5);
        let mut b = Fab::new(
            IndexBox::with_type(IntVect::splat(4), IntVect::splat(5), IndexType::Node),
            1,
        );
        b.fill(3.25);

        let mut cur = Cursor::new(Vec::new());
        let n = write_fab(&mut cur, &a).unwrap();
        write_fab(&mut cur, &b).unwrap();

        cur.seek(SeekFrom::Start(0)).unwrap();
        assert_eq!(read_fab(&mut cur).unwrap(), a);
        assert_eq!(cur.position(), n);
        assert_eq!(read_fab(&mut cur).unwrap(), b);
    }

    #[test]
    fn truncated_record_fails() {
        let fab = Fab::new(IndexBox::from_extent(IntVect::splat(2)), 1);
        let mut bytes = Vec::new();
        write_fab(&mut bytes, &fab).unwrap();
        bytes.truncate(bytes.len() - 4);
        assert!(read_fab(&mut bytes.as_slice()).is_err());
        assert!(read_fab(&mut "XYZ\n".as_bytes()).is_err());
    }
}
