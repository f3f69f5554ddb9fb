// crates/lw_io/src/writer.rs

//! ASCII 栅格快照写出器
//!
//! 时间切片写到 `<目录>/<短名>/<名称>_<短名>_NNNN.asc`，极值写到
//! `<目录>/<名称>_<标签>.asc`。每层的文件头取其窗口的左下角。

use std::fs;
use std::path::{Path, PathBuf};

use lw_foundation::{GridFrame, LwResult};
use lw_physics::{MaximaSet, OutputLayer, SnapshotSink, TimeSlice};
use tracing::debug;

use crate::ascii_grid::write_ascii_grid;
use crate::error::{IoError, IoResult};

/// ASCII 快照写出器
#[derive(Debug, Clone)]
pub struct AsciiSnapshotWriter {
    directory: PathBuf,
    name: String,
    frame: GridFrame,
    files_written: usize,
}

impl AsciiSnapshotWriter {
    /// 创建写出器；输出目录在首次写出时创建
    pub fn new(directory: impl Into<PathBuf>, name: impl Into<String>, frame: GridFrame) -> Self {
        Self {
            directory: directory.into(),
            name: name.into(),
            frame,
            files_written: 0,
        }
    }

    /// 输出根目录
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// 已写出的文件数
    pub fn files_written(&self) -> usize {
        self.files_written
    }

    /// 时间切片文件路径
    pub fn slice_path(&self, key: &str, index: usize) -> PathBuf {
        self.directory
            .join(key)
            .join(format!("{}_{key}_{index:04}.asc", self.name))
    }

    /// 极值文件路径
    pub fn maxima_path(&self, label: &str) -> PathBuf {
        self.directory.join(format!("{}_{label}.asc", self.name))
    }

    fn write_layer(&mut self, path: &Path, layer: &OutputLayer) -> IoResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| IoError::io(parent, e))?;
        }
        let frame = self.frame.sub_frame(&layer.window);
        let scale = layer.kind.display_scale();
        if scale == 1.0 {
            write_ascii_grid(path, &frame, &layer.data)?;
        } else {
            write_ascii_grid(path, &frame, &layer.data.map(|&v| v * scale))?;
        }
        self.files_written += 1;
        debug!(path = %path.display(), field = layer.kind.description(), "已写出栅格");
        Ok(())
    }
}

impl SnapshotSink for AsciiSnapshotWriter {
    fn write_slice(&mut self, slice: &TimeSlice) -> LwResult<()> {
        for layer in slice.layers.iter().filter(|l| !l.window.is_empty()) {
            let path = self.slice_path(layer.kind.key(), slice.index);
            self.write_layer(&path, layer)?;
        }
        Ok(())
    }

    fn write_maxima(&mut self, maxima: &MaximaSet) -> LwResult<()> {
        for layer in maxima.layers.iter().filter(|l| !l.window.is_empty()) {
            let path = self.maxima_path(&layer.label);
            self.write_layer(&path, layer)?;
        }
        Ok(())
    }
}
