// crates/lw_physics/tests/coupled_processes.rs

//! 耦合过程验证
//!
//! 通过完整的时间步检查侵蚀、沉积、动态地表、曲率与森林：
//!
//! - 侵蚀时流体体积与床层体积之和守恒，床层从不被透支
//! - 极值场在运行期间正确跟踪床层最小值与沉积最大值
//! - 动态地表按床层与沉积重建几何
//! - 凹形沟道中运动单元的法向重力被曲率增大
//! - 森林在流动作用下断裂，不透明度只减不增，并反过来减小阻力

use std::path::PathBuf;

use lw_config::{ErosionKind, FrictionParams, RunConfig};
use lw_foundation::{Grid2, GridFrame};
use lw_physics::{SimParams, Simulation, SimulationBuilder, SiteData, StopReason, TerrainGeometry};

// ============================================================
// 辅助函数
// ============================================================

fn config(mu: f64, k: f64) -> RunConfig {
    let mut cfg = RunConfig::default();
    cfg.inputs.grid = PathBuf::from("dem.asc");
    cfg.inputs.release_depth = PathBuf::from("h.asc");
    cfg.physics.friction = FrictionParams::Constant { mu, k };
    cfg
}

fn ramms_config(coefficient: f64) -> RunConfig {
    let mut cfg = config(0.2, 0.002);
    cfg.inputs.bed_depth = Some(PathBuf::from("b.asc"));
    cfg.physics.erosion.model = ErosionKind::Ramms;
    cfg.physics.erosion.coefficient = coefficient;
    cfg
}

fn frame(m: usize, n: usize, cs: f64) -> GridFrame {
    GridFrame { m, n, xll: 0.0, yll: 0.0, cellsize: cs }
}

/// 沿 i 方向下降的斜面
fn slope(m: usize, n: usize, cs: f64, degrees: f64) -> Grid2<f64> {
    let tan = degrees.to_radians().tan();
    let mut z = Grid2::new(m, n, 0.0);
    for i in 0..m {
        for j in 0..n {
            z[(i, j)] = 1000.0 - tan * i as f64 * cs;
        }
    }
    z
}

fn block(m: usize, n: usize, rows: std::ops::Range<usize>, h: f64) -> Grid2<f64> {
    let mut g = Grid2::new(m, n, 0.0);
    for i in rows {
        for j in 0..n {
            g[(i, j)] = h;
        }
    }
    g
}

fn cells(m: usize, n: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..m).flat_map(move |i| (0..n).map(move |j| (i, j)))
}

/// 流体体积与床层体积（换算为流体密度）之和
fn flow_plus_bed(sim: &Simulation) -> f64 {
    let (m, n) = sim.geometry().shape();
    let rrb = sim.params().rrb;
    let da = &sim.geometry().da;
    let bed: f64 = cells(m, n).map(|(i, j)| sim.bed().b[(i, j)] * da[(i, j)] / rrb).sum();
    sim.state().total_mass() + bed
}

/// 25° 斜面上的侵蚀流：释放区下方的一段床层很薄，侵蚀会被限幅
fn eroding_slope(cfg: &RunConfig) -> Simulation {
    let (m, n, cs) = (70, 4, 5.0);
    let params = SimParams::from_config(cfg).unwrap();
    let mut bed = Grid2::new(m, n, 0.5);
    for i in 25..31 {
        for j in 0..n {
            bed[(i, j)] = 0.01;
        }
    }
    let mut site = SiteData::new(frame(m, n, cs), slope(m, n, cs, 25.0), block(m, n, 20..24, 1.0));
    site.bed_depth = Some(bed);
    SimulationBuilder::new(params, site).build().unwrap()
}

// ============================================================
// 侵蚀与沉积
// ============================================================

#[test]
fn test_erosion_conserves_flow_plus_bed() {
    let mut sim = eroding_slope(&ramms_config(0.05));
    let (m, n) = sim.geometry().shape();
    let initial_mass = sim.state().total_mass();
    let initial_bed: f64 = cells(m, n).map(|c| sim.bed().b[c]).sum();
    let initial = flow_plus_bed(&sim);

    for _ in 0..30 {
        let report = sim.step().unwrap();
        assert_ne!(report.stop, Some(StopReason::StepCollapse));

        let total = flow_plus_bed(&sim);
        assert!(
            ((total - initial) / initial).abs() < 1e-10,
            "流体 + 床层体积漂移: {total} vs {initial}"
        );
        for c in cells(m, n) {
            let b = sim.bed().b[c];
            assert!(b >= 0.0, "床层透支: {c:?} b = {b}");
            assert!(sim.tracking().b_min[c] <= b);
        }
    }

    // 床层被卷入流体
    let bed_now: f64 = cells(m, n).map(|c| sim.bed().b[c]).sum();
    assert!(bed_now < initial_bed);
    assert!(sim.state().total_mass() > initial_mass);
    // 薄床层段被完全侵蚀
    assert!((25..31).any(|i| sim.bed().b[(i, 1)] < 1e-12));
    assert!(sim.tracking().b_min[(24, 1)] < 0.5);

    let maxima = sim.maxima();
    assert!(maxima.layers.iter().any(|l| l.label == "b_min"));
}

#[test]
fn test_deposit_maximum_tracks_arrested_mass() {
    let (m, n, cs) = (40, 4, 5.0);
    let mut cfg = config(0.4, 0.002);
    cfg.physics.deposition = true;
    let params = SimParams::from_config(&cfg).unwrap();
    let mut site = SiteData::new(frame(m, n, cs), slope(m, n, cs, 5.0), block(m, n, 4..8, 1.5));
    site.start_velocity = Some((Grid2::new(m, n, 8.0), Grid2::new(m, n, 0.0)));
    let mut sim = SimulationBuilder::new(params, site).build().unwrap();

    let mut previous = sim.tracking().d_max.clone();
    let mut stopped = false;
    for _ in 0..400 {
        let report = sim.step().unwrap();
        let d_max = &sim.tracking().d_max;
        for c in cells(m, n) {
            assert!(d_max[c] >= previous[c]);
            assert!(d_max[c] >= sim.bed().d[c]);
        }
        previous = d_max.clone();
        if report.stop.is_some() {
            assert_eq!(report.stop, Some(StopReason::Stopped));
            stopped = true;
            break;
        }
    }
    assert!(stopped);
    assert!(previous.max_value() > 0.0);

    let maxima = sim.maxima();
    let d_layer = maxima.layers.iter().find(|l| l.label == "d_max").unwrap();
    assert_eq!(d_layer.data.max_value(), previous.max_value());
}

// ============================================================
// 动态地表
// ============================================================

#[test]
fn test_dynamic_surface_rebuilds_geometry_from_reservoirs() {
    let mut cfg = ramms_config(0.05);
    cfg.physics.dynamic_surface = true;
    let mut sim = eroding_slope(&cfg);
    let (m, n) = sim.geometry().shape();
    let cs = sim.geometry().cellsize();
    let g = sim.geometry().gravity();
    let da0 = sim.geometry().da.clone();

    for _ in 0..15 {
        let gz0 = sim.geometry().gz0.clone();
        let report = sim.step().unwrap();
        assert_ne!(report.stop, Some(StopReason::StepCollapse));

        let mut z = sim.base_surface().clone();
        for c in cells(m, n) {
            z[c] += (sim.bed().b[c] + sim.bed().d[c]) * g / gz0[c];
        }
        let expected = TerrainGeometry::build(&z, cs, g).unwrap();
        for c in cells(m, n) {
            assert!((sim.geometry().da[c] - expected.da[c]).abs() < 1e-9);
            assert!((sim.geometry().gx[c] - expected.gx[c]).abs() < 1e-12);
            assert!((sim.geometry().gz0[c] - expected.gz0[c]).abs() < 1e-12);
        }
    }

    assert!(cells(m, n).any(|c| (sim.geometry().da[c] - da0[c]).abs() > 1e-9));
}

#[test]
fn test_static_surface_keeps_geometry() {
    let mut sim = eroding_slope(&ramms_config(0.05));
    let da0 = sim.geometry().da.clone();
    for _ in 0..10 {
        sim.step().unwrap();
    }
    assert_eq!(sim.geometry().da, da0);
}

// ============================================================
// 曲率
// ============================================================

/// 沿 i 方向的凹形沟道 z = 1000 − 0.6x + 0.002x²
fn concave_chute(curvature: bool) -> Simulation {
    let (m, n, cs) = (60, 5, 5.0);
    let mut cfg = config(0.2, 0.002);
    cfg.physics.curvature = curvature;
    let params = SimParams::from_config(&cfg).unwrap();

    let mut z = Grid2::new(m, n, 0.0);
    for i in 0..m {
        let x = i as f64 * cs;
        for j in 0..n {
            z[(i, j)] = 1000.0 - 0.6 * x + 0.002 * x * x;
        }
    }
    let mut site = SiteData::new(frame(m, n, cs), z, block(m, n, 10..14, 1.0));
    site.start_velocity = Some((Grid2::new(m, n, 5.0), Grid2::new(m, n, 0.0)));
    SimulationBuilder::new(params, site).build().unwrap()
}

#[test]
fn test_curvature_loads_moving_cells_in_concave_chute() {
    let mut sim = concave_chute(true);
    let (m, n) = sim.geometry().shape();
    let u_min = sim.params().u_min;
    let mut checked = 0;

    for _ in 0..15 {
        let window = sim.window();
        let s_prev = sim.primitives().s.clone();
        let report = sim.step().unwrap();
        assert_ne!(report.stop, Some(StopReason::StepCollapse));

        let geom = sim.geometry();
        for (i, j) in window.cells() {
            if s_prev[(i, j)] > u_min && i > 0 && i < m - 1 {
                assert!(geom.gz[(i, j)] > geom.gz0[(i, j)], "({i}, {j}) 未增大法向重力");
                checked += 1;
            } else if s_prev[(i, j)] == 0.0 {
                assert_eq!(geom.gz[(i, j)], geom.gz0[(i, j)]);
            }
        }
        for c in cells(m, n) {
            assert!(geom.gz[c] >= 0.0);
        }
    }
    assert!(checked > 0);
}

#[test]
fn test_without_curvature_normal_gravity_is_static() {
    let mut sim = concave_chute(false);
    for _ in 0..10 {
        sim.step().unwrap();
    }
    assert_eq!(sim.geometry().gz, sim.geometry().gz0);
}

// ============================================================
// 森林
// ============================================================

fn forested_slope(modulus_of_rupture_mpa: f64) -> Simulation {
    let (m, n, cs) = (40, 4, 5.0);
    let mut cfg = config(0.2, 0.002);
    cfg.inputs.forest_density = Some(PathBuf::from("nd.asc"));
    cfg.inputs.tree_diameter = Some(PathBuf::from("td.asc"));
    cfg.physics.forest.enabled = true;
    cfg.physics.forest.modulus_of_rupture_mpa = modulus_of_rupture_mpa;
    let params = SimParams::from_config(&cfg).unwrap();

    let mut site = SiteData::new(frame(m, n, cs), slope(m, n, cs, 25.0), block(m, n, 4..8, 1.5));
    site.forest_density = Some(Grid2::new(m, n, 0.05));
    site.tree_diameter = Some(Grid2::new(m, n, 0.3));
    SimulationBuilder::new(params, site).build().unwrap()
}

#[test]
fn test_forest_breaks_and_never_regrows() {
    let mut sim = forested_slope(0.01);
    let (m, n) = sim.geometry().shape();
    let nd0 = sim.forest().unwrap().density().clone();

    for _ in 0..20 {
        let before = sim.forest().unwrap().density().clone();
        let report = sim.step().unwrap();
        assert_ne!(report.stop, Some(StopReason::StepCollapse));
        let after = sim.forest().unwrap().density();
        for c in cells(m, n) {
            assert!(after[c] <= before[c], "{c:?} 不透明度增大");
        }
    }

    let forest = sim.forest().unwrap();
    // 释放区内树木已断裂并倒伏
    assert!(forest.decay[(5, 1)] > 0.0);
    assert!(forest.density()[(5, 1)] < nd0[(5, 1)]);
    // 流动未到达的单元保持完好
    assert_eq!(forest.decay[(m - 1, 0)], 0.0);
    assert_eq!(forest.density()[(m - 1, 0)], nd0[(m - 1, 0)]);
}

#[test]
fn test_broken_forest_offers_less_resistance() {
    let run_until = |sim: &mut Simulation, t_end: f64| {
        while sim.time() < t_end {
            let report = sim.step().unwrap();
            assert!(report.stop.is_none());
        }
    };

    let mut broken = forested_slope(0.01);
    let mut intact = forested_slope(1.0e6);
    run_until(&mut broken, 3.0);
    run_until(&mut intact, 3.0);

    assert!(intact.forest().unwrap().decay.max_value() == 0.0);
    assert!(broken.forest().unwrap().decay.max_value() > 0.0);
    assert!(broken.tracking().s_max.max_value() > intact.tracking().s_max.max_value());
}
