use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use esi_core::{Error, Result};
use esi_numerics::Vec3;
use tracing::debug;

use crate::cloud::PointCloud;

fn io_err(path: &Path, source: std::io::Error) -> Error {
    Error::io(path, source)
}

fn parse_f64(context: &str, token: &str) -> Result<f64> {
    token
        .parse::<f64>()
        .map_err(|_| Error::invalid_input(context, format!("not a number: {token:?}")))
}

// -- XYZ -----------------------------------------------------------------
//
// Text format: line 1 is `<count> <radius>`; then one `<x> <y> <z> <name>`
// per point.

pub fn read_xyz(path: impl AsRef<Path>) -> Result<(PointCloud, f64)> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| io_err(path, e))?;
    let mut lines = BufReader::new(file).lines();

    let header = lines
        .next()
        .ok_or_else(|| Error::invalid_input("read_xyz", "empty file"))?
        .map_err(|e| io_err(path, e))?;
    let mut header_tokens = header.split_whitespace();
    let count: usize = header_tokens
        .next()
        .ok_or_else(|| Error::invalid_input("read_xyz", "missing count"))?
        .parse()
        .map_err(|_| Error::invalid_input("read_xyz", "count is not an integer"))?;
    let radius: f64 = header_tokens
        .next()
        .ok_or_else(|| Error::invalid_input("read_xyz", "missing radius"))?
        .parse()
        .map_err(|_| Error::invalid_input("read_xyz", "radius is not a number"))?;

    let mut cloud = PointCloud::with_capacity(count);
    for line in lines {
        let line = line.map_err(|e| io_err(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let x = parse_f64("read_xyz", tokens.next().unwrap_or(""))?;
        let y = parse_f64("read_xyz", tokens.next().unwrap_or(""))?;
        let z = parse_f64("read_xyz", tokens.next().unwrap_or(""))?;
        let name = tokens.next().map(|s| s.to_string());
        cloud.push(Vec3::new(x, y, z), name);
    }

    if cloud.len() != count {
        return Err(Error::invalid_input(
            "read_xyz",
            format!("header declared {count} points, found {}", cloud.len()),
        ));
    }
    debug!(target: "points.io", path = %path.display(), count, radius, "read xyz point cloud");
    Ok((cloud, radius))
}

pub fn write_xyz(path: impl AsRef<Path>, cloud: &PointCloud, radius: f64) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| io_err(path, e))?;
    let mut w = BufWriter::new(file);
    writeln!(w, "{} {}", cloud.len(), radius).map_err(|e| io_err(path, e))?;
    for (i, p) in cloud.iter().enumerate() {
        let name = cloud.name(i).unwrap_or("");
        writeln!(w, "{} {} {} {}", p.x, p.y, p.z, name).map_err(|e| io_err(path, e))?;
    }
    Ok(())
}

// -- SPI / SPIRR -----------------------------------------------------------
//
// Text format, no header: one `<x> <y> <z> <name>` per line. SPIRR uses the
// identical layout (the "RR" suffix only marks provenance, not framing).

pub fn read_spi(path: impl AsRef<Path>) -> Result<PointCloud> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| io_err(path, e))?;
    let mut cloud = PointCloud::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| io_err(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let x = parse_f64("read_spi", tokens.next().unwrap_or(""))?;
        let y = parse_f64("read_spi", tokens.next().unwrap_or(""))?;
        let z = parse_f64("read_spi", tokens.next().unwrap_or(""))?;
        let name = tokens.next().map(|s| s.to_string());
        cloud.push(Vec3::new(x, y, z), name);
    }
    debug!(target: "points.io", path = %path.display(), count = cloud.len(), "read spi point cloud");
    Ok(cloud)
}

pub fn write_spi(path: impl AsRef<Path>, cloud: &PointCloud) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| io_err(path, e))?;
    let mut w = BufWriter::new(file);
    for (i, p) in cloud.iter().enumerate() {
        match cloud.name(i) {
            Some(name) => writeln!(w, "{} {} {} {}", p.x, p.y, p.z, name),
            None => writeln!(w, "{} {} {}", p.x, p.y, p.z),
        }
        .map_err(|e| io_err(path, e))?;
    }
    Ok(())
}

// -- ELS -------------------------------------------------------------------

/// Electrode cluster geometry (spec.md §3 "PointCluster").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterKind {
    Point,
    Line,
    Grid,
    ThreeD,
}

impl ClusterKind {
    fn as_token(self) -> &'static str {
        match self {
            ClusterKind::Point => "point",
            ClusterKind::Line => "line",
            ClusterKind::Grid => "grid",
            ClusterKind::ThreeD => "3d",
        }
    }

    fn from_token(token: &str) -> Result<Self> {
        match token {
            "point" => Ok(ClusterKind::Point),
            "line" => Ok(ClusterKind::Line),
            "grid" => Ok(ClusterKind::Grid),
            "3d" => Ok(ClusterKind::ThreeD),
            other => Err(Error::invalid_input(
                "ClusterKind::from_token",
                format!("unrecognized cluster type {other:?}"),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ElsCluster {
    pub name: String,
    pub kind: ClusterKind,
    pub points: PointCloud,
}

/// A full `.els` document: a magic-tagged file declaring a total electrode
/// count followed by named, typed clusters (spec.md §6).
#[derive(Debug, Clone, Default)]
pub struct ElsDoc {
    pub clusters: Vec<ElsCluster>,
}

impl ElsDoc {
    pub fn total_electrodes(&self) -> usize {
        self.clusters.iter().map(|c| c.points.len()).sum()
    }
}

const ELS_MAGIC: &str = "ES01";

pub fn read_els(path: impl AsRef<Path>) -> Result<ElsDoc> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| io_err(path, e))?;
    let mut lines = BufReader::new(file).lines();

    let magic = lines
        .next()
        .ok_or_else(|| Error::invalid_input("read_els", "empty file"))?
        .map_err(|e| io_err(path, e))?;
    if magic.trim() != ELS_MAGIC {
        return Err(Error::invalid_input(
            "read_els",
            format!("bad magic: expected {ELS_MAGIC:?}, got {magic:?}"),
        ));
    }

    let total_count: usize = lines
        .next()
        .ok_or_else(|| Error::invalid_input("read_els", "missing total count"))?
        .map_err(|e| io_err(path, e))?
        .trim()
        .parse()
        .map_err(|_| Error::invalid_input("read_els", "total count is not an integer"))?;

    let num_clusters: usize = lines
        .next()
        .ok_or_else(|| Error::invalid_input("read_els", "missing cluster count"))?
        .map_err(|e| io_err(path, e))?
        .trim()
        .parse()
        .map_err(|_| Error::invalid_input("read_els", "cluster count is not an integer"))?;

    let mut clusters = Vec::with_capacity(num_clusters);
    for _ in 0..num_clusters {
        let name = lines
            .next()
            .ok_or_else(|| Error::invalid_input("read_els", "missing cluster name"))?
            .map_err(|e| io_err(path, e))?
            .trim()
            .to_string();
        let count: usize = lines
            .next()
            .ok_or_else(|| Error::invalid_input("read_els", "missing cluster count"))?
            .map_err(|e| io_err(path, e))?
            .trim()
            .parse()
            .map_err(|_| Error::invalid_input("read_els", "cluster point count is not an integer"))?;
        let kind_token = lines
            .next()
            .ok_or_else(|| Error::invalid_input("read_els", "missing cluster type"))?
            .map_err(|e| io_err(path, e))?;
        let kind = ClusterKind::from_token(kind_token.trim())?;

        let mut points = PointCloud::with_capacity(count);
        for _ in 0..count {
            let line = lines
                .next()
                .ok_or_else(|| Error::invalid_input("read_els", "missing cluster point"))?
                .map_err(|e| io_err(path, e))?;
            let mut tokens = line.split_whitespace();
            let x = parse_f64("read_els", tokens.next().unwrap_or(""))?;
            let y = parse_f64("read_els", tokens.next().unwrap_or(""))?;
            let z = parse_f64("read_els", tokens.next().unwrap_or(""))?;
            let name = tokens.next().map(|s| s.to_string());
            points.push(Vec3::new(x, y, z), name);
        }
        clusters.push(ElsCluster { name, kind, points });
    }

    let doc = ElsDoc { clusters };
    if doc.total_electrodes() != total_count {
        return Err(Error::invalid_input(
            "read_els",
            format!(
                "header declared {total_count} electrodes, clusters hold {}",
                doc.total_electrodes()
            ),
        ));
    }
    debug!(
        target: "points.io",
        path = %path.display(),
        clusters = doc.clusters.len(),
        total_electrodes = doc.total_electrodes(),
        "read els electrode document"
    );
    Ok(doc)
}

pub fn write_els(path: impl AsRef<Path>, doc: &ElsDoc) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| io_err(path, e))?;
    let mut w = BufWriter::new(file);
    writeln!(w, "{ELS_MAGIC}").map_err(|e| io_err(path, e))?;
    writeln!(w, "{}", doc.total_electrodes()).map_err(|e| io_err(path, e))?;
    writeln!(w, "{}", doc.clusters.len()).map_err(|e| io_err(path, e))?;
    for cluster in &doc.clusters {
        writeln!(w, "{}", cluster.name).map_err(|e| io_err(path, e))?;
        writeln!(w, "{}", cluster.points.len()).map_err(|e| io_err(path, e))?;
        writeln!(w, "{}", cluster.kind.as_token()).map_err(|e| io_err(path, e))?;
        for (i, p) in cluster.points.iter().enumerate() {
            match cluster.points.name(i) {
                Some(name) => writeln!(w, "{} {} {} {}", p.x, p.y, p.z, name),
                None => writeln!(w, "{} {} {}", p.x, p.y, p.z),
            }
            .map_err(|e| io_err(path, e))?;
        }
    }
    Ok(())
}

// -- LOC -------------------------------------------------------------------

const LOC_MAGIC: i32 = 1;

/// Options controlling [`read_loc`]'s "Besa" center-subtraction rewrite
/// (spec.md §9 Open Question: exposed as a flag defaulted to the
/// permissive behavior the original source used unconditionally).
#[derive(Debug, Clone, Copy)]
pub struct LocReadOptions {
    pub subtract_besa_center: bool,
}

impl Default for LocReadOptions {
    fn default() -> Self {
        Self {
            subtract_besa_center: true,
        }
    }
}

fn besa_center_for_axis(axis_max: f64) -> f64 {
    if axis_max <= 0.0 {
        return 0.0;
    }
    let pow2 = 2f64.powf(axis_max.log2().ceil());
    pow2 / 2.0
}

/// Reads a `.loc` file: binary magic int (=1), int count, then `count`
/// float64 `(x, y, z)` triples in meters. Coordinates are scaled by 1000
/// to millimeters on read, matching every other format in the workspace.
pub fn read_loc(path: impl AsRef<Path>, options: LocReadOptions) -> Result<PointCloud> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|e| io_err(path, e))?;

    let mut magic_buf = [0u8; 4];
    file.read_exact(&mut magic_buf).map_err(|e| io_err(path, e))?;
    let magic = i32::from_le_bytes(magic_buf);
    if magic != LOC_MAGIC {
        return Err(Error::invalid_input(
            "read_loc",
            format!("bad magic: expected {LOC_MAGIC}, got {magic}"),
        ));
    }

    let mut count_buf = [0u8; 4];
    file.read_exact(&mut count_buf).map_err(|e| io_err(path, e))?;
    let count = i32::from_le_bytes(count_buf);
    if count < 0 {
        return Err(Error::invalid_input("read_loc", "negative point count"));
    }
    let count = count as usize;

    let mut raw = Vec::with_capacity(count);
    let mut triple = [0u8; 24];
    for _ in 0..count {
        file.read_exact(&mut triple).map_err(|e| io_err(path, e))?;
        let x = f64::from_le_bytes(triple[0..8].try_into().unwrap()) * 1000.0;
        let y = f64::from_le_bytes(triple[8..16].try_into().unwrap()) * 1000.0;
        let z = f64::from_le_bytes(triple[16..24].try_into().unwrap()) * 1000.0;
        raw.push(Vec3::new(x, y, z));
    }

    if options.subtract_besa_center {
        let max_x = raw.iter().fold(f64::NEG_INFINITY, |m, p| m.max(p.x));
        let max_y = raw.iter().fold(f64::NEG_INFINITY, |m, p| m.max(p.y));
        let max_z = raw.iter().fold(f64::NEG_INFINITY, |m, p| m.max(p.z));
        let center = Vec3::new(
            besa_center_for_axis(max_x),
            besa_center_for_axis(max_y),
            besa_center_for_axis(max_z),
        );
        for p in raw.iter_mut() {
            *p = *p - center;
        }
    }

    debug!(target: "points.io", path = %path.display(), count, subtract_besa_center = options.subtract_besa_center, "read loc point cloud");
    Ok(PointCloud::from_points(raw))
}

/// Writes a `.loc` file from millimeter coordinates, dividing by 1000 to
/// match the meter-scaled on-disk representation [`read_loc`] expects.
pub fn write_loc(path: impl AsRef<Path>, cloud: &PointCloud) -> Result<()> {
    let path = path.as_ref();
    let mut file = File::create(path).map_err(|e| io_err(path, e))?;
    file.write_all(&LOC_MAGIC.to_le_bytes()).map_err(|e| io_err(path, e))?;
    file.write_all(&(cloud.len() as i32).to_le_bytes())
        .map_err(|e| io_err(path, e))?;
    for p in cloud.iter() {
        file.write_all(&(p.x / 1000.0).to_le_bytes()).map_err(|e| io_err(path, e))?;
        file.write_all(&(p.y / 1000.0).to_le_bytes()).map_err(|e| io_err(path, e))?;
        file.write_all(&(p.z / 1000.0).to_le_bytes()).map_err(|e| io_err(path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn xyz_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cloud.xyz");
        let cloud = PointCloud::from_points(vec![Vec3::new(1.0, 2.0, 3.0), Vec3::new(-1.0, 0.0, 5.0)]);
        write_xyz(&path, &cloud, 80.0).unwrap();
        let (read_back, radius) = read_xyz(&path).unwrap();
        assert_eq!(read_back.len(), 2);
        assert_eq!(radius, 80.0);
        assert_eq!(read_back.get(1).unwrap(), Vec3::new(-1.0, 0.0, 5.0));
    }

    #[test]
    fn spi_round_trips_without_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("points.spi");
        let mut cloud = PointCloud::new();
        cloud.push(Vec3::new(10.0, 10.0, 10.0), Some("SP1".into()));
        write_spi(&path, &cloud).unwrap();
        let read_back = read_spi(&path).unwrap();
        assert_eq!(read_back.len(), 1);
        assert_eq!(read_back.name(0), Some("SP1"));
    }

    #[test]
    fn els_round_trips_clusters() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("electrodes.els");
        let mut grid = PointCloud::new();
        grid.push(Vec3::new(0.0, 0.0, 0.0), Some("G1".into()));
        let doc = ElsDoc {
            clusters: vec![ElsCluster {
                name: "Grid A".into(),
                kind: ClusterKind::Grid,
                points: grid,
            }],
        };
        write_els(&path, &doc).unwrap();
        let read_back = read_els(&path).unwrap();
        assert_eq!(read_back.total_electrodes(), 1);
        assert_eq!(read_back.clusters[0].kind, ClusterKind::Grid);
    }

    #[test]
    fn els_bad_magic_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.els");
        std::fs::write(&path, "NOTMAGIC\n0\n0\n").unwrap();
        assert!(read_els(&path).is_err());
    }

    #[test]
    fn loc_round_trips_with_meter_scaling() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("points.loc");
        let cloud = PointCloud::from_points(vec![Vec3::new(10.0, 20.0, 30.0)]);
        write_loc(&path, &cloud).unwrap();
        let read_back = read_loc(
            &path,
            LocReadOptions {
                subtract_besa_center: false,
            },
        )
        .unwrap();
        assert!((read_back.get(0).unwrap().x - 10.0).abs() < 1e-6);
    }

    #[test]
    fn loc_besa_center_subtraction_centers_the_cloud() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("besa.loc");
        // Max axis value 100 -> nearest power of two above is 128, center 64.
        let cloud = PointCloud::from_points(vec![Vec3::new(100.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 0.0)]);
        write_loc(&path, &cloud).unwrap();
        let read_back = read_loc(&path, LocReadOptions::default()).unwrap();
        assert!((read_back.get(0).unwrap().x - 36.0).abs() < 1e-6);
    }

    #[test]
    fn loc_rejects_bad_magic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.loc");
        std::fs::write(&path, 99i32.to_le_bytes()).unwrap();
        assert!(read_loc(&path, LocReadOptions::default()).is_err());
    }
}
