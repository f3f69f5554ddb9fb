// crates/lw_physics/src/engine/transport.rs

//! 输运步进器
//!
//! 迎风型显式更新：每个单元按速度方向向下游三个邻居（x、y 与对角）
//! 输出质量与动量，通量区域为双线性近似的扫掠面积：
//!
//! ```text
//! ax = |u|·Δt   ay = |v|·Δt
//! dA_x = ax·(dy − ay)   dA_y = ay·(dx − ax)   dA_d = ax·ay
//! ```
//!
//! 网格外的邻居不接收通量（开边界）。单元按栅格顺序（外层 i，内层 j）
//! 依次处理，后处理的单元可能向尚未处理的邻居写入，因此本步进器严格串行。
//!
//! # 尝试与提交
//!
//! [`TransportStepper::attempt`] 在内部工作副本上完成一次完整的通量累积，
//! 不修改已接受的状态；任意单元质量为负即返回 [`AttemptResult::Rejected`]。
//! [`TransportStepper::advance`] 以固定因子缩小步长重试，直到接受或步长
//! 低于下限。接受后由 [`TransportStepper::commit`] 交换缓冲区，旧状态
//! 保留为 [`TransportStepper::previous`] 供反向检查使用。

use lw_foundation::{Grid2, IndexWindow};
use tracing::{debug, warn};

use crate::material::{BedReservoirs, MaterialFields};
use crate::sources::{limit_mass_source, ReservoirRates, SourceField};
use crate::state::{ConservedState, PrimitiveFields, MASS, MOM_X, MOM_Y};
use crate::terrain::TerrainGeometry;
use crate::types::SimParams;

/// 单步尝试所需的只读输入
#[derive(Debug, Clone, Copy)]
pub struct TransportContext<'a> {
    /// 单元几何
    pub geom: &'a TerrainGeometry,
    /// 步初原始变量
    pub prim: &'a PrimitiveFields,
    /// 材料场（静摩擦使用单元 μ）
    pub mat: &'a MaterialFields,
    /// 源项
    pub sources: &'a SourceField,
    /// 活动窗口
    pub window: IndexWindow,
}

/// 单次尝试结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttemptResult {
    /// 所有单元质量非负
    Accepted,
    /// 出现负质量的首个单元
    Rejected {
        /// 单元索引
        cell: (usize, usize),
    },
}

/// 带重试的推进结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdvanceOutcome {
    /// 以 `dt` 接受
    Accepted {
        /// 实际步长
        dt: f64,
        /// 重试次数
        retries: usize,
    },
    /// 步长低于下限
    Collapsed {
        /// 最后一次尝试的步长
        dt: f64,
        /// 重试次数
        retries: usize,
    },
}

/// 单元边界土压力 `[西, 东, 南, 北]`
pub type FacePressures = [f64; 4];

/// 输运步进器
#[derive(Debug, Clone)]
pub struct TransportStepper {
    kp: f64,
    u_min: f64,
    rates: ReservoirRates,
    /// 工作副本；提交后保存上一步状态
    work: ConservedState,
    /// 储库工作副本
    bed: BedReservoirs,
}

impl TransportStepper {
    /// 创建步进器
    pub fn new(params: &SimParams, m: usize, n: usize) -> Self {
        Self {
            kp: params.kp,
            u_min: params.u_min,
            rates: ReservoirRates::from_params(params),
            work: ConservedState::new(m, n),
            bed: BedReservoirs::empty(m, n),
        }
    }

    /// 单次尝试
    ///
    /// 从 `state`/`bed` 复制出工作副本并完成整个窗口的累积。
    /// 储库同样每次从已接受值重新复制，被拒绝的尝试不会留下侵蚀或沉积。
    /// 返回 [`AttemptResult::Accepted`] 时结果保存在内部，需调用
    /// [`commit`](Self::commit) 生效。
    pub fn attempt(
        &mut self,
        ctx: &TransportContext<'_>,
        state: &ConservedState,
        bed: &BedReservoirs,
        dt: f64,
    ) -> AttemptResult {
        self.work.copy_from(state);
        self.bed.copy_from(bed);

        let geom = ctx.geom;
        let prim = ctx.prim;
        let (m, n) = geom.shape();

        for (i, j) in ctx.window.cells() {
            let (u, v, h) = (prim.u[(i, j)], prim.v[(i, j)], prim.h[(i, j)]);
            let f_old = state.cell(i, j);
            let da = geom.da[(i, j)];

            let di: isize = if u >= 0.0 { 1 } else { -1 };
            let dj: isize = if v >= 0.0 { 1 } else { -1 };
            let ax = u.abs() * dt;
            let ay = v.abs() * dt;
            let da_x = ax * (geom.dy[(i, j)] - ay);
            let da_y = ay * (geom.dx[(i, j)] - ax);
            let da_d = ax * ay;

            let [src_mass, src_x, src_y] = ctx.sources[(i, j)];
            let src_mass = limit_mass_source(
                src_mass,
                &mut self.bed.b[(i, j)],
                &mut self.bed.d[(i, j)],
                f_old[MASS],
                da,
                &self.rates,
                dt,
            );

            let qh = [h * da_x, h * da_y, h * da_d];
            let out = self.work.cell_mut(i, j);
            out[MASS] -= qh[0] + qh[1] + qh[2] - src_mass * dt;
            out[MOM_X] -= (qh[0] + qh[1] + qh[2]) * u;
            out[MOM_Y] -= (qh[0] + qh[1] + qh[2]) * v;

            let ni = neighbor(i, di, m);
            let nj = neighbor(j, dj, n);
            if let Some(ni) = ni {
                add_flux(self.work.cell_mut(ni, j), qh[0], u, v);
            }
            if let Some(nj) = nj {
                add_flux(self.work.cell_mut(i, nj), qh[1], u, v);
            }
            if let (Some(ni), Some(nj)) = (ni, nj) {
                add_flux(self.work.cell_mut(ni, nj), qh[2], u, v);
            }

            if self.work.mass(i, j) < 0.0 {
                return AttemptResult::Rejected { cell: (i, j) };
            }

            let [p_w, p_e, p_s, p_n] = earth_pressure(geom, &prim.h, self.kp, &ctx.window, i, j);

            let out = self.work.cell_mut(i, j);
            if prim.s[(i, j)] <= self.u_min {
                let fx = geom.gx[(i, j)] * f_old[MASS] + p_w - p_e;
                let fy = geom.gy[(i, j)] * f_old[MASS] + p_s - p_n;
                let ff = ctx.mat.mu[(i, j)] * geom.gz[(i, j)] * f_old[MASS];
                if let Some((ix, iy)) = static_friction_impulse(fx, fy, geom.g_xy[(i, j)], ff) {
                    out[MOM_X] += ix * dt;
                    out[MOM_Y] += iy * dt;
                }
            } else {
                out[MOM_X] += (p_w - p_e + src_x) * dt;
                out[MOM_Y] += (p_s - p_n + src_y) * dt;
            }
        }

        AttemptResult::Accepted
    }

    /// 带步长缩减的推进
    ///
    /// 每次被拒绝后 `dt ← dt·shrink`；步长低于 `dt_min` 时返回
    /// [`AdvanceOutcome::Collapsed`]，此时已接受状态保持不变。
    pub fn advance(
        &mut self,
        ctx: &TransportContext<'_>,
        state: &ConservedState,
        bed: &BedReservoirs,
        dt: f64,
        dt_min: f64,
        shrink: f64,
    ) -> AdvanceOutcome {
        let mut dt = dt;
        let mut retries = 0;
        loop {
            match self.attempt(ctx, state, bed, dt) {
                AttemptResult::Accepted => return AdvanceOutcome::Accepted { dt, retries },
                AttemptResult::Rejected { cell } => {
                    retries += 1;
                    debug!(i = cell.0, j = cell.1, dt, "单元质量为负，拒绝本步");
                    dt *= shrink;
                    if dt < dt_min {
                        warn!(dt, dt_min, retries, "重试中时间步长低于下限");
                        return AdvanceOutcome::Collapsed { dt, retries };
                    }
                }
            }
        }
    }

    /// 提交最近一次被接受的尝试（交换缓冲区）
    pub fn commit(&mut self, state: &mut ConservedState, bed: &mut BedReservoirs) {
        std::mem::swap(state, &mut self.work);
        std::mem::swap(bed, &mut self.bed);
    }

    /// 提交前的状态（仅在 [`commit`](Self::commit) 之后有意义）
    pub fn previous(&self) -> &ConservedState {
        &self.work
    }

    /// 反向检查：动量相对上一步反向且指向上坡的单元被制停
    ///
    /// 启用沉积时，被制停单元的质量转入沉积储库。返回被制停的单元数。
    pub fn arrest_reversals(
        &self,
        state: &mut ConservedState,
        bed: &mut BedReservoirs,
        geom: &TerrainGeometry,
        window: &IndexWindow,
    ) -> usize {
        let mut arrested = 0;
        for (i, j) in window.cells() {
            let old = self.work.cell(i, j);
            let new = state.cell_mut(i, j);
            let reversed = old[MOM_X] * new[MOM_X] + old[MOM_Y] * new[MOM_Y] < 0.0;
            let uphill = new[MOM_X] * geom.gx[(i, j)] + new[MOM_Y] * geom.gy[(i, j)] < 0.0;
            if reversed && uphill {
                if self.rates.deposition {
                    bed.d[(i, j)] += new[MASS] / geom.da[(i, j)];
                    new[MASS] = 0.0;
                }
                new[MOM_X] = 0.0;
                new[MOM_Y] = 0.0;
                arrested += 1;
            }
        }
        arrested
    }
}

#[inline]
fn neighbor(idx: usize, step: isize, len: usize) -> Option<usize> {
    idx.checked_add_signed(step).filter(|&k| k < len)
}

#[inline]
fn add_flux(cell: &mut [f64; 3], q: f64, u: f64, v: f64) {
    cell[MASS] += q;
    cell[MOM_X] += q * u;
    cell[MOM_Y] += q * v;
}

/// 单元四个边界上的静水土压力
///
/// 面压力 `p = 0.25·k_p·边长·(g_z,a + g_z,b)·h_a·h_b`。窗口边缘单元只有
/// 一个可用面，两侧取相同值（零梯度）；窗口在该方向只有一个单元时为零。
pub fn earth_pressure(
    geom: &TerrainGeometry,
    h: &Grid2<f64>,
    kp: f64,
    window: &IndexWindow,
    i: usize,
    j: usize,
) -> FacePressures {
    let face_x = |a: usize, b: usize| {
        0.25 * kp * geom.dy[(b, j)] * (geom.gz[(a, j)] + geom.gz[(b, j)]) * h[(a, j)] * h[(b, j)]
    };
    let face_y = |a: usize, b: usize| {
        0.25 * kp * geom.dx[(i, b)] * (geom.gz[(i, a)] + geom.gz[(i, b)]) * h[(i, a)] * h[(i, b)]
    };

    let (p_w, p_e) = if window.width() < 2 {
        (0.0, 0.0)
    } else if i == window.i_min {
        let p = face_x(i, i + 1);
        (p, p)
    } else if i == window.i_max - 1 {
        let p = face_x(i - 1, i);
        (p, p)
    } else {
        (face_x(i - 1, i), face_x(i, i + 1))
    };

    let (p_s, p_n) = if window.height() < 2 {
        (0.0, 0.0)
    } else if j == window.j_min {
        let p = face_y(j, j + 1);
        (p, p)
    } else if j == window.j_max - 1 {
        let p = face_y(j - 1, j);
        (p, p)
    } else {
        (face_y(j - 1, j), face_y(j, j + 1))
    };

    [p_w, p_e, p_s, p_n]
}

/// 静止单元的启动判断
///
/// 驱动力 `(fx, fy)` 的度量范数超过最大静摩擦 `ff` 时，返回扣除摩擦后的
/// 净力；否则两者抵消，返回 `None`。
#[inline]
pub fn static_friction_impulse(fx: f64, fy: f64, g_xy: f64, ff: f64) -> Option<(f64, f64)> {
    let drive2 = fx * fx + fy * fy + 2.0 * g_xy * fx * fy;
    let ff = ff.abs();
    if drive2 > ff * ff {
        let drive = drive2.sqrt();
        Some((fx - fx / drive * ff, fy - fy / drive * ff))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lw_config::{FrictionParams, RunConfig};
    use std::path::PathBuf;

    fn params(deposition: bool) -> SimParams {
        let mut cfg = RunConfig::default();
        cfg.inputs.grid = PathBuf::from("dem.asc");
        cfg.inputs.release_depth = PathBuf::from("h.asc");
        cfg.physics.friction = FrictionParams::Constant { mu: 0.3, k: 0.002 };
        cfg.physics.deposition = deposition;
        SimParams::from_config(&cfg).unwrap()
    }

    struct Fixture {
        geom: TerrainGeometry,
        prim: PrimitiveFields,
        mat: MaterialFields,
        sources: SourceField,
        state: ConservedState,
        bed: BedReservoirs,
    }

    fn fixture(m: usize, n: usize, cs: f64, h: &Grid2<f64>, u: f64, v: f64, mu: f64) -> Fixture {
        let geom = TerrainGeometry::build(&Grid2::new(m, n, 0.0), cs, 9.81).unwrap();
        let state = ConservedState::from_primitives(
            h,
            &Grid2::new(m, n, u),
            &Grid2::new(m, n, v),
            &geom,
        )
        .unwrap();
        let mut prim = PrimitiveFields::new(m, n);
        prim.recover(&state, &geom, &geom.full_window(), 250.0, 0.05);
        Fixture {
            geom,
            prim,
            mat: MaterialFields::uniform(m, n, mu, 0.0),
            sources: SourceField::new(m, n, [0.0; 3]),
            state,
            bed: BedReservoirs::empty(m, n),
        }
    }

    fn ctx(f: &Fixture) -> TransportContext<'_> {
        TransportContext {
            geom: &f.geom,
            prim: &f.prim,
            mat: &f.mat,
            sources: &f.sources,
            window: f.geom.full_window(),
        }
    }

    #[test]
    fn test_rest_state_is_stable() {
        let f = fixture(5, 5, 10.0, &Grid2::new(5, 5, 1.0), 0.0, 0.0, 0.3);
        let mut stepper = TransportStepper::new(&params(false), 5, 5);
        let outcome = stepper.advance(&ctx(&f), &f.state, &f.bed, 0.2, 1e-4, 0.8);
        assert_eq!(outcome, AdvanceOutcome::Accepted { dt: 0.2, retries: 0 });

        let (mut state, mut bed) = (f.state.clone(), f.bed.clone());
        stepper.commit(&mut state, &mut bed);
        assert_eq!(state, f.state);
    }

    #[test]
    fn test_mass_moves_downstream() {
        let mut h = Grid2::new(6, 6, 0.0);
        h[(2, 2)] = 1.0;
        let f = fixture(6, 6, 10.0, &h, 5.0, 2.0, 0.0);
        let mut stepper = TransportStepper::new(&params(false), 6, 6);
        assert_eq!(stepper.attempt(&ctx(&f), &f.state, &f.bed, 0.5), AttemptResult::Accepted);
        let (mut state, mut bed) = (f.state.clone(), f.bed.clone());
        stepper.commit(&mut state, &mut bed);

        // ax = 2.5, ay = 1.0
        assert!((state.mass(3, 2) - 2.5 * 9.0).abs() < 1e-9);
        assert!((state.mass(2, 3) - 1.0 * 7.5).abs() < 1e-9);
        assert!((state.mass(3, 3) - 2.5).abs() < 1e-9);
        assert!((state.total_mass() - 100.0).abs() < 1e-9);
        assert_eq!(stepper.previous(), &f.state);
    }

    #[test]
    fn test_open_boundary_loses_mass() {
        let mut h = Grid2::new(3, 3, 0.0);
        h[(2, 1)] = 1.0;
        let f = fixture(3, 3, 10.0, &h, 4.0, 0.0, 0.0);
        let mut stepper = TransportStepper::new(&params(false), 3, 3);
        assert_eq!(stepper.attempt(&ctx(&f), &f.state, &f.bed, 1.0), AttemptResult::Accepted);
        let (mut state, mut bed) = (f.state.clone(), f.bed.clone());
        stepper.commit(&mut state, &mut bed);
        assert!((state.total_mass() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_oversized_step_is_rejected_and_shrunk() {
        let mut h = Grid2::new(4, 4, 0.0);
        h[(1, 1)] = 1.0;
        let f = fixture(4, 4, 1.0, &h, 10.0, 0.0, 0.0);
        let mut stepper = TransportStepper::new(&params(false), 4, 4);
        let c = ctx(&f);
        // 10·dt > 1 时出流超过单元质量
        assert_eq!(
            stepper.attempt(&c, &f.state, &f.bed, 0.2),
            AttemptResult::Rejected { cell: (1, 1) }
        );

        match stepper.advance(&c, &f.state, &f.bed, 0.2, 1e-4, 0.8) {
            AdvanceOutcome::Accepted { dt, retries } => {
                assert!(dt <= 0.1);
                assert_eq!(retries, 4);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        let (mut state, mut bed) = (f.state.clone(), f.bed.clone());
        stepper.commit(&mut state, &mut bed);
        assert!(state.min_mass() >= 0.0);
    }

    #[test]
    fn test_retry_restarts_bed_from_accepted_values() {
        let mut h = Grid2::new(4, 4, 0.0);
        h[(1, 1)] = 1.0;
        let mut f = fixture(4, 4, 1.0, &h, 10.0, 0.0, 0.0);
        f.bed = BedReservoirs::with_bed(Grid2::new(4, 4, 1.0));
        f.sources[(0, 0)] = [0.5, 0.0, 0.0];
        let mut p = params(false);
        p.erosion = lw_config::ErosionKind::Ramms;
        let mut stepper = TransportStepper::new(&p, 4, 4);

        let dt = match stepper.advance(&ctx(&f), &f.state, &f.bed, 0.2, 1e-4, 0.8) {
            AdvanceOutcome::Accepted { dt, retries } => {
                assert_eq!(retries, 4);
                dt
            }
            other => panic!("unexpected outcome {other:?}"),
        };
        let (mut state, mut bed) = (f.state.clone(), f.bed.clone());
        stepper.commit(&mut state, &mut bed);

        // 只计入被接受步长的侵蚀量
        let expected = 1.0 - 0.5 * p.rrb * dt;
        assert!((bed.b[(0, 0)] - expected).abs() < 1e-12);
        assert!((state.mass(0, 0) - 0.5 * dt).abs() < 1e-12);
        assert_eq!(f.bed.b[(0, 0)], 1.0);
    }

    #[test]
    fn test_collapse_leaves_state_untouched() {
        let mut h = Grid2::new(4, 4, 0.0);
        h[(1, 1)] = 1.0;
        let f = fixture(4, 4, 1.0, &h, 10.0, 0.0, 0.0);
        let mut stepper = TransportStepper::new(&params(false), 4, 4);
        let outcome = stepper.advance(&ctx(&f), &f.state, &f.bed, 1.0, 0.5, 0.8);
        assert!(matches!(outcome, AdvanceOutcome::Collapsed { retries: 4, .. }));
    }

    #[test]
    fn test_static_friction_threshold() {
        assert_eq!(static_friction_impulse(3.0, 4.0, 0.0, 5.0), None);
        let (ix, iy) = static_friction_impulse(3.0, 4.0, 0.0, 2.5).unwrap();
        assert!((ix - 1.5).abs() < 1e-12);
        assert!((iy - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_earth_pressure_edges() {
        let f = fixture(4, 3, 1.0, &Grid2::new(4, 3, 2.0), 0.0, 0.0, 0.0);
        let w = f.geom.full_window();
        let face = 0.25 * 1.0 * 1.0 * (2.0 * 9.81) * 4.0;
        let [p_w, p_e, p_s, p_n] = earth_pressure(&f.geom, &f.prim.h, 1.0, &w, 0, 1);
        assert!((p_w - face).abs() < 1e-12 && (p_e - face).abs() < 1e-12);
        assert!((p_s - face).abs() < 1e-12 && (p_n - face).abs() < 1e-12);

        let narrow = IndexWindow::new(1, 2, 0, 3);
        let [p_w, p_e, _, _] = earth_pressure(&f.geom, &f.prim.h, 1.0, &narrow, 1, 1);
        assert_eq!((p_w, p_e), (0.0, 0.0));
    }

    #[test]
    fn test_reversal_arrest_with_deposition() {
        // 斜面向 +x 下降；单元动量由下坡转为上坡
        let mut z = Grid2::new(3, 3, 0.0);
        for i in 0..3 {
            for j in 0..3 {
                z[(i, j)] = -(i as f64);
            }
        }
        let geom = TerrainGeometry::build(&z, 1.0, 9.81).unwrap();
        let mut stepper = TransportStepper::new(&params(true), 3, 3);
        let mut state = ConservedState::new(3, 3);
        *state.cell_mut(1, 1) = [2.0, 1.0, 0.0];
        let mut bed = BedReservoirs::empty(3, 3);
        stepper.commit(&mut state, &mut bed);
        // 交换后 previous 持有 [2, 1, 0]
        *state.cell_mut(1, 1) = [2.0, -1.0, 0.0];

        let n = stepper.arrest_reversals(&mut state, &mut bed, &geom, &geom.full_window());
        assert_eq!(n, 1);
        assert_eq!(*state.cell(1, 1), [0.0; 3]);
        assert!((bed.d[(1, 1)] - 2.0 / geom.da[(1, 1)]).abs() < 1e-12);
    }
}
