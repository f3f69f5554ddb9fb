// crates/lw_io/src/ascii_grid.rs

//! ESRI ASCII 栅格读写
//!
//! 文件头为六行 `关键字 值`（`xllcenter`/`yllcenter` 亦可），随后按行
//! 给出数据，首行为最北一行。读入后按 `(i, j)` 存储，`j = 0` 为最南行。

use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::Path;

use lw_foundation::{Grid2, GridFrame};

use crate::error::{IoError, IoResult};

/// 写出时的无数据值
pub const NODATA: f64 = -9999.0;

/// 读入的栅格
#[derive(Debug, Clone, PartialEq)]
pub struct AsciiGrid {
    /// 地理参照（左下角为角点坐标）
    pub frame: GridFrame,
    /// 文件声明的无数据值
    pub nodata: f64,
    /// 数据
    pub data: Grid2<f64>,
}

#[derive(Default)]
struct Header {
    ncols: Option<usize>,
    nrows: Option<usize>,
    xll: Option<f64>,
    yll: Option<f64>,
    x_center: bool,
    y_center: bool,
    cellsize: Option<f64>,
    nodata: Option<f64>,
}

/// 读取栅格文件
pub fn read_ascii_grid(path: &Path) -> IoResult<AsciiGrid> {
    let text = fs::read_to_string(path).map_err(|e| IoError::io(path, e))?;
    parse_ascii_grid(&text, path)
}

/// 解析栅格文本；`file` 仅用于错误信息
pub fn parse_ascii_grid(text: &str, file: &Path) -> IoResult<AsciiGrid> {
    let mut header = Header::default();
    let mut lines = text.lines().enumerate().peekable();

    while let Some(&(idx, line)) = lines.peek() {
        let mut tokens = line.split_whitespace();
        let Some(key) = tokens.next() else {
            lines.next();
            continue;
        };
        if !key.starts_with(|c: char| c.is_ascii_alphabetic()) {
            break;
        }
        let raw = tokens
            .next()
            .ok_or_else(|| IoError::parse(file, idx + 1, format!("头字段 {key} 缺少数值")))?;
        let number = || {
            raw.parse::<f64>()
                .map_err(|_| IoError::parse(file, idx + 1, format!("头字段 {key} 的值无效: {raw}")))
        };
        let count = || {
            raw.parse::<usize>()
                .map_err(|_| IoError::parse(file, idx + 1, format!("头字段 {key} 应为正整数: {raw}")))
        };
        match key.to_ascii_lowercase().as_str() {
            "ncols" => header.ncols = Some(count()?),
            "nrows" => header.nrows = Some(count()?),
            "xllcorner" => header.xll = Some(number()?),
            "yllcorner" => header.yll = Some(number()?),
            "xllcenter" => {
                header.xll = Some(number()?);
                header.x_center = true;
            }
            "yllcenter" => {
                header.yll = Some(number()?);
                header.y_center = true;
            }
            "cellsize" => header.cellsize = Some(number()?),
            "nodata_value" => header.nodata = Some(number()?),
            _ => return Err(IoError::parse(file, idx + 1, format!("未知头字段: {key}"))),
        }
        lines.next();
    }

    let missing = |key: &str| IoError::parse(file, 1, format!("文件头缺少 {key}"));
    let m = header.ncols.ok_or_else(|| missing("ncols"))?;
    let n = header.nrows.ok_or_else(|| missing("nrows"))?;
    let cellsize = header.cellsize.ok_or_else(|| missing("cellsize"))?;
    let mut xll = header.xll.ok_or_else(|| missing("xllcorner"))?;
    let mut yll = header.yll.ok_or_else(|| missing("yllcorner"))?;
    if m == 0 || n == 0 || !(cellsize > 0.0) {
        return Err(IoError::parse(file, 1, format!("网格尺寸无效: {m}×{n}, cellsize {cellsize}")));
    }
    if header.x_center {
        xll -= 0.5 * cellsize;
    }
    if header.y_center {
        yll -= 0.5 * cellsize;
    }

    let mut data = Grid2::new(m, n, 0.0);
    let total = m * n;
    let mut count = 0;
    let mut last_line = 1;
    for (idx, line) in lines {
        last_line = idx + 1;
        for token in line.split_whitespace() {
            let value: f64 = token
                .parse()
                .ok()
                .filter(|v: &f64| v.is_finite())
                .ok_or_else(|| IoError::parse(file, idx + 1, format!("无法解析数值: {token}")))?;
            if count == total {
                return Err(IoError::parse(file, idx + 1, format!("数据多于 {m}×{n} 个")));
            }
            let (row, i) = (count / m, count % m);
            data[(i, n - 1 - row)] = value;
            count += 1;
        }
    }
    if count < total {
        return Err(IoError::parse(
            file,
            last_line,
            format!("数据不足: 期望 {total} 个, 实际 {count} 个"),
        ));
    }

    Ok(AsciiGrid {
        frame: GridFrame { m, n, xll, yll, cellsize },
        nodata: header.nodata.unwrap_or(NODATA),
        data,
    })
}

/// 读取与参考网格对齐的栅格，并检查数值下限
pub fn read_aligned(path: &Path, reference: &GridFrame, min_value: f64) -> IoResult<AsciiGrid> {
    let grid = read_ascii_grid(path)?;
    check_header(path, reference, &grid.frame)?;
    check_lower_bound(path, &grid.data, min_value)?;
    Ok(grid)
}

/// 检查所有数值不低于 `min_value`
pub fn check_lower_bound(path: &Path, data: &Grid2<f64>, min_value: f64) -> IoResult<()> {
    let (m, n) = data.shape();
    for j in 0..n {
        for i in 0..m {
            let value = data[(i, j)];
            if value < min_value {
                return Err(IoError::BelowBound {
                    file: path.to_path_buf(),
                    i,
                    j,
                    value,
                    min: min_value,
                });
            }
        }
    }
    Ok(())
}

fn check_header(path: &Path, reference: &GridFrame, frame: &GridFrame) -> IoResult<()> {
    if reference.matches(frame) {
        return Ok(());
    }
    let mismatch = |key: &'static str, expected: String, actual: String| IoError::HeaderMismatch {
        file: path.to_path_buf(),
        key,
        expected,
        actual,
    };
    Err(if frame.m != reference.m {
        mismatch("ncols", reference.m.to_string(), frame.m.to_string())
    } else if frame.n != reference.n {
        mismatch("nrows", reference.n.to_string(), frame.n.to_string())
    } else if (frame.cellsize - reference.cellsize).abs() > 1e-4 {
        mismatch("cellsize", reference.cellsize.to_string(), frame.cellsize.to_string())
    } else if (frame.xll - reference.xll).abs() > 1e-3 {
        mismatch("xllcorner", reference.xll.to_string(), frame.xll.to_string())
    } else {
        mismatch("yllcorner", reference.yll.to_string(), frame.yll.to_string())
    })
}

/// 生成栅格文本（首行为最北一行）
pub fn format_ascii_grid(frame: &GridFrame, data: &Grid2<f64>) -> String {
    let (m, n) = data.shape();
    let mut out = String::with_capacity(64 + m * n * 8);
    // 写入 String 不会失败
    let _ = writeln!(out, "ncols         {m}");
    let _ = writeln!(out, "nrows         {n}");
    let _ = writeln!(out, "xllcorner     {:.1}", frame.xll);
    let _ = writeln!(out, "yllcorner     {:.1}", frame.yll);
    let _ = writeln!(out, "cellsize      {:.2}", frame.cellsize);
    let _ = writeln!(out, "NODATA_value  {NODATA}");
    for j in (0..n).rev() {
        for i in 0..m {
            if i > 0 {
                out.push(' ');
            }
            let _ = write!(out, "{:.3}", data[(i, j)]);
        }
        out.push('\n');
    }
    out
}

/// 写出栅格文件
pub fn write_ascii_grid(path: &Path, frame: &GridFrame, data: &Grid2<f64>) -> IoResult<()> {
    let text = format_ascii_grid(frame, data);
    let mut file = fs::File::create(path).map_err(|e| IoError::io(path, e))?;
    file.write_all(text.as_bytes()).map_err(|e| IoError::io(path, e))
}
