// crates/lw_physics/src/engine/simulation.rs

//! 模拟上下文与主循环
//!
//! [`Simulation`] 持有全部场与运行状态，是唯一的写入者。每个时间步
//! 的顺序固定：
//!
//! 1. 曲率修正（可选）
//! 2. CFL 步长；低于 `dt_min` 即终止
//! 3. 源项与森林状态
//! 4. 带重试的输运，接受后提交并做反向检查
//! 5. 动态地表（可选）
//! 6. 原始变量恢复与活动区域跟踪；动量低于阈值即停止
//!
//! [`Simulation::run`] 在此基础上按输出间隔写出时间切片，结束时写出
//! 全网格的最终切片与极值。

use lw_foundation::{Grid2, IndexWindow, LwResult};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::engine::timestep::CflController;
use crate::engine::tracker::{TrackerReport, TrackingFields};
use crate::engine::transport::{AdvanceOutcome, TransportContext, TransportStepper};
use crate::material::{BedReservoirs, MaterialFields};
use crate::output::{FieldKind, MaximaSet, OutputLayer, SnapshotSink, TimeSlice};
use crate::sources::{ForestStand, SourceField, SourceTermEngine};
use crate::state::{ConservedState, PrimitiveFields};
use crate::terrain::TerrainGeometry;
use crate::types::SimParams;

// ============================================================
// 终止原因
// ============================================================

/// 运行终止原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// 达到模拟时长
    TimeLimit,
    /// 动量低于阈值（停止或流出计算域）
    Stopped,
    /// 时间步长低于下限
    StepCollapse,
}

impl StopReason {
    /// 进程退出码
    pub fn exit_code(self) -> u8 {
        match self {
            Self::TimeLimit => 0,
            Self::Stopped => 1,
            Self::StepCollapse => 2,
        }
    }

    /// 是否为数值失败
    pub fn is_failure(self) -> bool {
        matches!(self, Self::StepCollapse)
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TimeLimit => write!(f, "达到模拟时长"),
            Self::Stopped => write!(f, "流动已停止或离开计算域"),
            Self::StepCollapse => write!(f, "时间步长低于下限"),
        }
    }
}

/// 单步报告
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepReport {
    /// 实际步长（终止时为最后一次尝试的步长）
    pub dt: f64,
    /// 负质量重试次数
    pub retries: usize,
    /// 运动体积
    pub moving_volume: f64,
    /// 动量指标
    pub momentum: f64,
    /// 本步结束后的活动窗口
    pub window: IndexWindow,
    /// 终止原因（继续运行时为 None）
    pub stop: Option<StopReason>,
}

/// 运行结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunOutcome {
    /// 终止原因
    pub reason: StopReason,
    /// 结束时间 [s]
    pub t: f64,
    /// 完成的步数
    pub n_step: usize,
    /// 写出的时间切片数
    pub n_dump: usize,
}

// ============================================================
// 模拟上下文
// ============================================================

/// 模拟上下文
#[derive(Debug)]
pub struct Simulation {
    params: SimParams,
    geom: TerrainGeometry,
    /// 初始化后的基准地表
    z0: Grid2<f64>,
    state: ConservedState,
    prim: PrimitiveFields,
    mat: MaterialFields,
    bed: BedReservoirs,
    forest: Option<ForestStand>,
    sources: SourceField,
    source_engine: SourceTermEngine,
    cfl: CflController,
    stepper: TransportStepper,
    tracking: TrackingFields,
    window: IndexWindow,
    t: f64,
    n_step: usize,
    t_dump: f64,
    t_last_dump: f64,
    n_dump: usize,
    last_report: Option<TrackerReport>,
}

impl Simulation {
    /// 由已初始化的场组装；原始变量在全网格上恢复，活动窗口为全网格
    pub(crate) fn assemble(
        params: SimParams,
        geom: TerrainGeometry,
        z0: Grid2<f64>,
        state: ConservedState,
        mat: MaterialFields,
        bed: BedReservoirs,
        forest: Option<ForestStand>,
    ) -> Self {
        let (m, n) = geom.shape();
        let window = geom.full_window();
        let mut prim = PrimitiveFields::new(m, n);
        prim.recover(&state, &geom, &window, params.rho, params.h_min);

        let tracking = TrackingFields::new(&bed, params.erosion_active(), params.deposition);
        Self {
            source_engine: SourceTermEngine::new(&params),
            cfl: CflController::from_params(&params),
            stepper: TransportStepper::new(&params, m, n),
            sources: SourceField::new(m, n, [0.0; 3]),
            t_dump: -params.dt_dump,
            params,
            geom,
            z0,
            state,
            prim,
            mat,
            bed,
            forest,
            tracking,
            window,
            t: 0.0,
            n_step: 0,
            t_last_dump: 0.0,
            n_dump: 0,
            last_report: None,
        }
    }

    /// 推进一步
    ///
    /// 步长过小或动量低于阈值时在报告中给出终止原因；此时时间不前进。
    pub fn step(&mut self) -> LwResult<StepReport> {
        let p = &self.params;

        if p.curvature {
            self.geom.apply_curvature(&self.prim.u, &self.prim.v, &self.window);
        }

        let dt = self.cfl.find_dt(&self.geom, &self.prim, &self.window);
        if dt < p.dt_min {
            warn!(dt, dt_min = p.dt_min, t = self.t, "CFL 时间步长低于下限");
            return Ok(self.halted(dt, 0, StopReason::StepCollapse));
        }

        self.source_engine.evaluate(
            &self.geom,
            &self.prim,
            &self.mat,
            &self.bed,
            self.forest.as_mut(),
            &self.window,
            dt,
            &mut self.sources,
        );

        let ctx = TransportContext {
            geom: &self.geom,
            prim: &self.prim,
            mat: &self.mat,
            sources: &self.sources,
            window: self.window,
        };
        let (dt, retries) = match self
            .stepper
            .advance(&ctx, &self.state, &self.bed, dt, p.dt_min, p.shrink)
        {
            AdvanceOutcome::Accepted { dt, retries } => (dt, retries),
            AdvanceOutcome::Collapsed { dt, retries } => {
                return Ok(self.halted(dt, retries, StopReason::StepCollapse));
            }
        };
        if retries > 0 {
            warn!(retries, dt, t = self.t, "出现负质量，时间步长已缩减");
        }

        self.stepper.commit(&mut self.state, &mut self.bed);
        self.stepper
            .arrest_reversals(&mut self.state, &mut self.bed, &self.geom, &self.window);

        if self.params.dynamic_surface {
            self.update_surface()?;
        }

        let (m, n) = self.geom.shape();
        let p = &self.params;
        self.prim.recover(
            &self.state,
            &self.geom,
            &self.window.grown(1, m, n),
            p.rho,
            p.h_min,
        );
        let report = self.tracking.update(
            &self.state,
            &self.prim,
            &self.bed,
            &self.geom,
            &self.window,
            p.h_min,
            p.u_min,
            p.rho,
        );
        self.window = report.window;
        self.last_report = Some(report);

        let stop = if report.momentum < p.mom_thr && self.n_step > p.warmup_steps {
            Some(StopReason::Stopped)
        } else {
            self.t += dt;
            self.n_step += 1;
            None
        };

        Ok(StepReport {
            dt,
            retries,
            moving_volume: report.moving_volume,
            momentum: report.momentum,
            window: report.window,
            stop,
        })
    }

    fn halted(&self, dt: f64, retries: usize, reason: StopReason) -> StepReport {
        let (moving_volume, momentum) = self
            .last_report
            .map_or((0.0, 0.0), |r| (r.moving_volume, r.momentum));
        StepReport {
            dt,
            retries,
            moving_volume,
            momentum,
            window: self.window,
            stop: Some(reason),
        }
    }

    /// 按床层与沉积更新地表并重建几何（全网格）
    fn update_surface(&mut self) -> LwResult<()> {
        let (m, n) = self.geom.shape();
        let g = self.params.g;
        let mut z = self.z0.clone();
        for i in 0..m {
            for j in 0..n {
                z[(i, j)] += (self.bed.b[(i, j)] + self.bed.d[(i, j)]) * g / self.geom.gz0[(i, j)];
            }
        }
        self.geom.update(&z)
    }

    /// 运行至终止，按输出间隔写出时间切片，结束时写出极值
    pub fn run<S: SnapshotSink + ?Sized>(&mut self, sink: &mut S) -> LwResult<RunOutcome> {
        let writes_slices = self.params.writes_slices();
        let dt_dump = self.params.dt_dump;
        let mut reason = StopReason::TimeLimit;

        info!(
            t_max = self.params.t_max,
            volume = self.state.total_mass(),
            "开始时间循环"
        );

        while self.t < self.params.t_max {
            if writes_slices && self.t >= self.t_dump + dt_dump {
                let slice = self.time_slice(false);
                sink.write_slice(&slice)?;
                info!(index = slice.index, t = self.t, "已写出时间切片");
                self.t_last_dump = self.t;
                self.t_dump += dt_dump;
                self.n_dump += 1;
            }

            let report = self.step()?;
            debug!(
                step = self.n_step,
                t = self.t,
                dt = report.dt,
                moving_volume = report.moving_volume,
                window = ?report.window,
                "时间步"
            );
            if let Some(stop) = report.stop {
                reason = stop;
                break;
            }
        }

        if writes_slices && self.t > self.t_last_dump {
            let slice = self.time_slice(true);
            sink.write_slice(&slice)?;
            info!(index = slice.index, t = self.t, "已写出最终时间切片");
            self.n_dump += 1;
        }
        sink.write_maxima(&self.maxima())?;

        if reason.is_failure() {
            warn!(t = self.t, steps = self.n_step, "模拟结束：{reason}");
        } else {
            info!(t = self.t, steps = self.n_step, "模拟结束：{reason}");
        }

        Ok(RunOutcome {
            reason,
            t: self.t,
            n_step: self.n_step,
            n_dump: self.n_dump,
        })
    }

    // ============================================================
    // 输出
    // ============================================================

    /// 当前时间切片
    ///
    /// `full` 为假时，深度、速率等取活动窗口（窗口为空时省略）；
    /// 沉积与森林始终取全网格。
    pub fn time_slice(&self, full: bool) -> TimeSlice {
        let p = &self.params;
        let (m, n) = self.geom.shape();
        let whole = IndexWindow::full(m, n);
        let window = if full { whole } else { self.window };
        let windowed = !window.is_empty();

        let mut layers = Vec::new();
        let mut push = |kind: FieldKind, field: &Grid2<f64>, w: IndexWindow| {
            layers.push(OutputLayer::from_field(kind, kind.key(), field, w));
        };
        if windowed {
            push(FieldKind::Depth, &self.prim.h, window);
            push(FieldKind::Speed, &self.prim.s, window);
            if p.erosion_active() {
                push(FieldKind::BedDepth, &self.bed.b, window);
            }
        }
        if p.deposition {
            push(FieldKind::Deposit, &self.bed.d, whole);
        }
        if windowed {
            if p.write_velocity {
                push(FieldKind::VelocityX, &self.prim.u, window);
                push(FieldKind::VelocityY, &self.prim.v, window);
            }
            if p.write_pressure {
                push(FieldKind::Pressure, &self.prim.p, window);
            }
        }
        if let Some(forest) = &self.forest {
            push(FieldKind::ForestDensity, forest.density(), whole);
        }

        TimeSlice {
            index: self.n_dump,
            time: self.t,
            layers,
        }
    }

    /// 全网格极值集合
    pub fn maxima(&self) -> MaximaSet {
        let p = &self.params;
        let tr = &self.tracking;
        let whole = self.geom.full_window();
        let layer = |kind: FieldKind, label: &str, field: &Grid2<f64>| {
            OutputLayer::from_field(kind, label, field, whole)
        };

        let deposit = if p.deposition {
            self.bed.d.clone()
        } else {
            tr.h_max.map(|h| p.rrd * h)
        };

        let mut layers = vec![
            layer(FieldKind::Deposit, "h_dep", &deposit),
            layer(FieldKind::Depth, "h_max", &tr.h_max),
            layer(FieldKind::Speed, "s_max", &tr.s_max),
        ];
        if p.erosion_active() {
            layers.push(layer(FieldKind::BedDepth, "b_min", &tr.b_min));
        }
        if p.deposition {
            layers.push(layer(FieldKind::Deposit, "d_max", &tr.d_max));
        }
        if p.write_velocity {
            layers.push(layer(FieldKind::VelocityX, "u_max", &tr.u_max));
            layers.push(layer(FieldKind::VelocityY, "v_max", &tr.v_max));
        }
        if p.write_max_pressure {
            layers.push(layer(FieldKind::Pressure, "p_max", &tr.p_max));
        }
        if let Some(forest) = &self.forest {
            layers.push(layer(FieldKind::ForestDensity, "nD_min", forest.density()));
        }

        MaximaSet {
            time: self.t,
            layers,
        }
    }

    // ============================================================
    // 访问器
    // ============================================================

    /// 运行参数
    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// 单元几何
    pub fn geometry(&self) -> &TerrainGeometry {
        &self.geom
    }

    /// 守恒状态
    pub fn state(&self) -> &ConservedState {
        &self.state
    }

    /// 原始变量
    pub fn primitives(&self) -> &PrimitiveFields {
        &self.prim
    }

    /// 材料场
    pub fn materials(&self) -> &MaterialFields {
        &self.mat
    }

    /// 床层与沉积
    pub fn bed(&self) -> &BedReservoirs {
        &self.bed
    }

    /// 森林
    pub fn forest(&self) -> Option<&ForestStand> {
        self.forest.as_ref()
    }

    /// 极值场
    pub fn tracking(&self) -> &TrackingFields {
        &self.tracking
    }

    /// 基准地表
    pub fn base_surface(&self) -> &Grid2<f64> {
        &self.z0
    }

    /// 当前活动窗口
    pub fn window(&self) -> IndexWindow {
        self.window
    }

    /// 模拟时间
    pub fn time(&self) -> f64 {
        self.t
    }

    /// 完成的步数
    pub fn n_step(&self) -> usize {
        self.n_step
    }
}
