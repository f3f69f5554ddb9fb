// crates/lw_io/src/site.rs

//! 按运行配置读入全部输入栅格
//!
//! 只读取当前模型组合需要的栅格；所有栅格须与地形网格对齐。

use std::path::Path;

use lw_config::{BedStrengthProfile, FrictionParams, RunConfig};
use lw_foundation::{Grid2, GridFrame, LwResult};
use lw_physics::SiteData;
use tracing::{debug, info};

use crate::ascii_grid::{check_lower_bound, read_aligned, read_ascii_grid};
use crate::error::{IoError, IoResult};

/// 地形高程下限（低于此值视为无数据）
pub const ELEVATION_MIN: f64 = -9998.9;

/// 初始速度下限
pub const VELOCITY_MIN: f64 = -9999.0;

/// 读入地形与配置要求的所有栅格
pub fn load_site(config: &RunConfig) -> LwResult<SiteData> {
    Ok(load(config)?)
}

fn load(config: &RunConfig) -> IoResult<SiteData> {
    let inputs = &config.inputs;
    let physics = &config.physics;

    let dem = read_ascii_grid(&inputs.grid)?;
    check_lower_bound(&inputs.grid, &dem.data, ELEVATION_MIN)?;
    let frame = dem.frame;
    info!(
        path = %inputs.grid.display(),
        m = frame.m,
        n = frame.n,
        cellsize = frame.cellsize,
        "已读取地形"
    );

    let release = aligned(&inputs.release_depth, &frame, 0.0)?;
    let mut site = SiteData::new(frame, dem.data, release);

    if inputs.is_restart() {
        let u = optional_velocity(inputs.start_velocity_u.as_deref(), &frame)?;
        let v = optional_velocity(inputs.start_velocity_v.as_deref(), &frame)?;
        site.start_velocity = Some((u, v));
        info!("给出初始速度，按续算处理");
    }

    let erosion = physics.erosion.model;
    if erosion.is_active() {
        site.bed_depth = Some(required(inputs.bed_depth.as_deref(), "bed_depth", &frame)?);
    }
    if erosion.needs_bed_strength() {
        site.bed_strength = Some(required(inputs.bed_strength.as_deref(), "bed_strength", &frame)?);
        if matches!(physics.erosion.bed_strength, BedStrengthProfile::Local) {
            site.bed_friction = Some(required(inputs.bed_friction.as_deref(), "bed_friction", &frame)?);
        }
    }
    if matches!(physics.friction, FrictionParams::Variable) {
        site.dry_friction = Some(required(inputs.dry_friction.as_deref(), "dry_friction", &frame)?);
        site.turbulent_drag = Some(required(inputs.turbulent_drag.as_deref(), "turbulent_drag", &frame)?);
    }
    if physics.forest.enabled {
        site.forest_density = Some(required(inputs.forest_density.as_deref(), "forest_density", &frame)?);
        site.tree_diameter = Some(required(inputs.tree_diameter.as_deref(), "tree_diameter", &frame)?);
    }

    Ok(site)
}

fn aligned(path: &Path, frame: &GridFrame, min_value: f64) -> IoResult<Grid2<f64>> {
    let grid = read_aligned(path, frame, min_value)?;
    debug!(path = %path.display(), "已读取栅格");
    Ok(grid.data)
}

fn required(path: Option<&Path>, name: &'static str, frame: &GridFrame) -> IoResult<Grid2<f64>> {
    let path = path.ok_or(IoError::MissingRaster { name })?;
    aligned(path, frame, 0.0)
}

/// 未给出的分量取零；无数据单元取零
fn optional_velocity(path: Option<&Path>, frame: &GridFrame) -> IoResult<Grid2<f64>> {
    match path {
        Some(path) => {
            let grid = read_aligned(path, frame, VELOCITY_MIN)?;
            let nodata = grid.nodata;
            Ok(grid.data.map(|&v| if v == nodata { 0.0 } else { v }))
        }
        None => Ok(Grid2::new(frame.m, frame.n, 0.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lw_config::ErosionKind;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, rows: &[&str], xll: f64) -> PathBuf {
        let path = dir.path().join(name);
        let mut text = format!(
            "ncols 3\nnrows 2\nxllcorner {xll}\nyllcorner 0\ncellsize 10\nNODATA_value -9999\n"
        );
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        fs::write(&path, text).unwrap();
        path
    }

    fn base(dir: &TempDir) -> RunConfig {
        let mut cfg = RunConfig::default();
        cfg.inputs.grid = write(dir, "dem.asc", &["30 30 30", "20 20 20"], 0.0);
        cfg.inputs.release_depth = write(dir, "h.asc", &["1 0 0", "0 0 0"], 0.0);
        cfg
    }

    #[test]
    fn test_minimal_site() {
        let dir = tempfile::tempdir().unwrap();
        let site = load_site(&base(&dir)).unwrap();
        assert_eq!(site.frame.m, 3);
        assert_eq!(site.elevation[(0, 1)], 30.0);
        assert_eq!(site.release_depth[(0, 1)], 1.0);
        assert!(!site.is_restart());
        assert!(site.bed_depth.is_none());
    }

    #[test]
    fn test_restart_with_single_component() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = base(&dir);
        cfg.inputs.start_velocity_u = Some(write(&dir, "u.asc", &["2 -9999 0", "0 0 0"], 0.0));
        let site = load_site(&cfg).unwrap();
        let (u, v) = site.start_velocity.unwrap();
        assert_eq!(u[(0, 1)], 2.0);
        assert_eq!(u[(1, 1)], 0.0);
        assert_eq!(v.max_value(), 0.0);
    }

    #[test]
    fn test_erosion_rasters_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = base(&dir);
        cfg.physics.erosion.model = ErosionKind::Ramms;
        cfg.inputs.bed_depth = Some(write(&dir, "b.asc", &["0.5 0.5 0.5", "0.5 0.5 0.5"], 0.0));
        let site = load_site(&cfg).unwrap();
        assert_eq!(site.bed_depth.unwrap()[(2, 0)], 0.5);
        assert!(site.bed_strength.is_none());
    }

    #[test]
    fn test_negative_release_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = base(&dir);
        cfg.inputs.release_depth = write(&dir, "h_bad.asc", &["1 -9999 0", "0 0 0"], 0.0);
        assert!(load_site(&cfg).is_err());
    }

    #[test]
    fn test_misaligned_raster_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = base(&dir);
        cfg.inputs.release_depth = write(&dir, "h_shift.asc", &["1 0 0", "0 0 0"], 5.0);
        assert!(load_site(&cfg).is_err());
    }

    #[test]
    fn test_missing_required_raster() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = base(&dir);
        cfg.physics.forest.enabled = true;
        let err = load_site(&cfg).unwrap_err();
        assert!(err.is_configuration());
    }
}
