use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use esi_core::{Error, Result};
use esi_maps::AtomType;
use esi_numerics::Dense2D;

use crate::matrix::{InverseMatrixDoc, Regularization};

fn io_err(path: &Path, source: std::io::Error) -> Error {
    Error::io(path, source)
}

/// 4-byte ASCII magic tag for the inverse-matrix v3 file, naming both the
/// format ("ISM", inverse source matrix) and its version.
const MAGIC: &[u8; 4] = b"ISM3";

fn read_u32(r: &mut impl Read, path: &Path) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(|e| io_err(path, e))?;
    Ok(u32::from_le_bytes(buf))
}

fn read_f64(r: &mut impl Read, path: &Path) -> Result<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf).map_err(|e| io_err(path, e))?;
    Ok(f64::from_le_bytes(buf))
}

fn read_f32(r: &mut impl Read, path: &Path) -> Result<f32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(|e| io_err(path, e))?;
    Ok(f32::from_le_bytes(buf))
}

/// Reads an inverse-matrix v3 file (spec.md §6): magic, then a header of
/// `(numElectrodes, numSolPoints, numRegs, isScalar)` as little-endian
/// u32s, then `numRegs` `(name_len: u32, name: [u8; name_len], value:
/// f64)` regularization records, then `numRegs` row-major float32
/// matrices of shape `(lines x numElectrodes)` concatenated by
/// regularization index.
pub fn read_inverse_matrix(path: impl AsRef<Path>) -> Result<InverseMatrixDoc> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| io_err(path, e))?;
    let mut r = BufReader::new(file);

    let mut magic = [0u8; 4];
    r.read_exact(&mut magic).map_err(|e| io_err(path, e))?;
    if &magic != MAGIC {
        return Err(Error::invalid_input(
            "read_inverse_matrix",
            format!("bad magic: expected {MAGIC:?}, got {magic:?}"),
        ));
    }

    let num_electrodes = read_u32(&mut r, path)? as usize;
    let num_sol_points = read_u32(&mut r, path)? as usize;
    let num_regs = read_u32(&mut r, path)? as usize;
    let is_scalar = read_u32(&mut r, path)? != 0;
    let atom_type = if is_scalar { AtomType::Scalar } else { AtomType::Vectorial };

    let mut regularizations = Vec::with_capacity(num_regs);
    for _ in 0..num_regs {
        let name_len = read_u32(&mut r, path)? as usize;
        let mut name_buf = vec![0u8; name_len];
        r.read_exact(&mut name_buf).map_err(|e| io_err(path, e))?;
        let name = String::from_utf8(name_buf)
            .map_err(|_| Error::invalid_input("read_inverse_matrix", "regularization name is not valid UTF-8"))?;
        let value = read_f64(&mut r, path)?;
        regularizations.push(Regularization { name, value });
    }

    let lines = num_sol_points * atom_type.components();
    let mut matrices = Vec::with_capacity(num_regs);
    for _ in 0..num_regs {
        let mut matrix = Dense2D::<f32>::new(lines, num_electrodes);
        for l in 0..lines {
            for e in 0..num_electrodes {
                let value = read_f32(&mut r, path)?;
                matrix.set(l, e, value)?;
            }
        }
        matrices.push(matrix);
    }

    InverseMatrixDoc::new(num_electrodes, num_sol_points, atom_type, regularizations, matrices)
}

/// Writes an inverse-matrix v3 file matching [`read_inverse_matrix`]'s
/// layout byte-exactly.
pub fn write_inverse_matrix(path: impl AsRef<Path>, doc: &InverseMatrixDoc) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| io_err(path, e))?;
    let mut w = BufWriter::new(file);

    w.write_all(MAGIC).map_err(|e| io_err(path, e))?;
    w.write_all(&(doc.num_electrodes() as u32).to_le_bytes()).map_err(|e| io_err(path, e))?;
    w.write_all(&(doc.num_sol_points() as u32).to_le_bytes()).map_err(|e| io_err(path, e))?;
    w.write_all(&(doc.num_regularizations() as u32).to_le_bytes()).map_err(|e| io_err(path, e))?;
    let is_scalar = doc.atom_type() == AtomType::Scalar;
    w.write_all(&(is_scalar as u32).to_le_bytes()).map_err(|e| io_err(path, e))?;

    for reg in doc.regularizations() {
        let name_bytes = reg.name.as_bytes();
        w.write_all(&(name_bytes.len() as u32).to_le_bytes()).map_err(|e| io_err(path, e))?;
        w.write_all(name_bytes).map_err(|e| io_err(path, e))?;
        w.write_all(&reg.value.to_le_bytes()).map_err(|e| io_err(path, e))?;
    }

    for reg_index in 0..doc.num_regularizations() {
        let matrix = doc.matrix(reg_index)?;
        let (lines, electrodes) = matrix.dims();
        for l in 0..lines {
            for value in &matrix.row(l)[..electrodes] {
                w.write_all(&value.to_le_bytes()).map_err(|e| io_err(path, e))?;
            }
        }
    }
    Ok(())
}
