// 该文件是 Shouxie （手写识字） 项目的一部分。
// src/raster.rs - 单色画布光栅化
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_circle_mut;
use tracing::debug;

use crate::stroke::PointerSample;

/// 画布边长（像素）
pub const CANVAS_SIZE: u32 = 280;
/// 笔画宽度（像素）
pub const STROKE_WIDTH: f32 = 16.0;

pub const BACKGROUND: Luma<u8> = Luma([0]);
pub const FOREGROUND: Luma<u8> = Luma([255]);

// 圆形笔刷沿线段的盖章间距
const STAMP_SPACING: f32 = 1.0;

/// 单色画布：黑色背景，白色笔画，圆形线帽与连接
#[derive(Debug, Clone)]
pub struct RasterSurface {
  image: GrayImage,
  anchor: Option<PointerSample>,
  stroke_width: f32,
}

impl Default for RasterSurface {
  fn default() -> Self {
    Self::new(CANVAS_SIZE, CANVAS_SIZE)
  }
}

impl RasterSurface {
  pub fn new(width: u32, height: u32) -> Self {
    Self {
      image: GrayImage::from_pixel(width, height, BACKGROUND),
      anchor: None,
      stroke_width: STROKE_WIDTH,
    }
  }

  pub fn with_stroke_width(mut self, stroke_width: f32) -> Self {
    self.stroke_width = stroke_width;
    self
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }

  pub fn anchor(&self) -> Option<PointerSample> {
    self.anchor
  }

  pub fn as_image(&self) -> &GrayImage {
    &self.image
  }

  /// 复制当前像素，供异步分类使用
  pub fn snapshot(&self) -> GrayImage {
    self.image.clone()
  }

  pub fn is_blank(&self) -> bool {
    self.image.pixels().all(|p| *p == BACKGROUND)
  }

  /// 以 `point` 为起点开始新路径，不绘制
  pub fn begin_stroke(&mut self, point: PointerSample) {
    if !is_finite(&point) {
      debug!("忽略非法坐标: {:?}", point);
      return;
    }
    self.anchor = Some(point);
  }

  /// 从锚点画线到 `point`，随后锚点移动到 `point`
  pub fn extend_stroke(&mut self, point: PointerSample) {
    if !is_finite(&point) {
      debug!("忽略非法坐标: {:?}", point);
      return;
    }
    match self.anchor {
      Some(anchor) => self.paint_segment(anchor, point),
      None => debug!("没有锚点，仅设置起点: {:?}", point),
    }
    self.anchor = Some(point);
  }

  /// 线段落在画布（外扩半个线宽）内的部分，完全不可见或坐标非法时返回 `None`
  pub(crate) fn visible_segment(
    &self,
    from: PointerSample,
    to: PointerSample,
  ) -> Option<(PointerSample, PointerSample)> {
    if !is_finite(&from) || !is_finite(&to) {
      return None;
    }
    let radius = self.stroke_width / 2.0;
    clip_segment(
      from,
      to,
      -radius,
      -radius,
      self.width() as f32 + radius,
      self.height() as f32 + radius,
    )
  }

  /// 结束当前路径，保留像素
  pub fn end_stroke(&mut self) {
    self.anchor = None;
  }

  pub fn clear(&mut self) {
    for pixel in self.image.pixels_mut() {
      *pixel = BACKGROUND;
    }
    self.anchor = None;
  }

  // 用圆形笔刷沿线段盖章，得到圆头圆角的粗线
  fn paint_segment(&mut self, from: PointerSample, to: PointerSample) {
    let Some((from, to)) = self.visible_segment(from, to) else {
      return;
    };

    let brush = Brush::new(self.stroke_width);
    let distance = from.distance(&to);
    let stamps = (distance / STAMP_SPACING).ceil().max(0.0) as usize;
    for i in 0..=stamps {
      let t = if stamps == 0 {
        0.0
      } else {
        i as f32 / stamps as f32
      };
      let center = PointerSample::new(
        from.x + (to.x - from.x) * t,
        from.y + (to.y - from.y) * t,
      );
      brush.stamp(&mut self.image, center);
    }
  }
}

/// 整数像素上宽度恰为线宽的圆形笔刷
///
/// `draw_filled_circle_mut` 画出的圆直径总是奇数 `2r + 1`。偶数线宽由四个
/// 相邻的半径 `(d - 1) / 2` 的圆拼成，覆盖中心两侧各 `d / 2` 个像素。
#[derive(Debug, Clone, Copy)]
struct Brush {
  radius: i32,
  even: bool,
}

impl Brush {
  fn new(stroke_width: f32) -> Self {
    let diameter = stroke_width.round().max(1.0) as i32;
    Self {
      radius: (diameter - 1) / 2,
      even: diameter % 2 == 0,
    }
  }

  fn stamp(&self, image: &mut GrayImage, center: PointerSample) {
    // 像素 i 的中心在 i + 0.5
    let (x, y) = (center.x - 0.5, center.y - 0.5);
    if self.even {
      let (x, y) = (x.floor() as i32, y.floor() as i32);
      for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
        draw_filled_circle_mut(image, (x + dx, y + dy), self.radius, FOREGROUND);
      }
    } else {
      draw_filled_circle_mut(
        image,
        (x.round() as i32, y.round() as i32),
        self.radius,
        FOREGROUND,
      );
    }
  }
}

fn is_finite(point: &PointerSample) -> bool {
  point.x.is_finite() && point.y.is_finite()
}

/// Liang–Barsky 线段裁剪，线段完全在矩形外时返回 `None`
///
/// 端点可能远在画布之外，在 f64 中计算以免相减时丢失画布内的精度。
fn clip_segment(
  from: PointerSample,
  to: PointerSample,
  x_min: f32,
  y_min: f32,
  x_max: f32,
  y_max: f32,
) -> Option<(PointerSample, PointerSample)> {
  let (fx, fy) = (from.x as f64, from.y as f64);
  let dx = to.x as f64 - fx;
  let dy = to.y as f64 - fy;
  let mut t0 = 0.0f64;
  let mut t1 = 1.0f64;

  for (p, q) in [
    (-dx, fx - x_min as f64),
    (dx, x_max as f64 - fx),
    (-dy, fy - y_min as f64),
    (dy, y_max as f64 - fy),
  ] {
    if p == 0.0 {
      if q < 0.0 {
        return None;
      }
      continue;
    }
    let r = q / p;
    if p < 0.0 {
      if r > t1 {
        return None;
      }
      t0 = t0.max(r);
    } else {
      if r < t0 {
        return None;
      }
      t1 = t1.min(r);
    }
  }

  Some((
    PointerSample::new((fx + t0 * dx) as f32, (fy + t0 * dy) as f32),
    PointerSample::new((fx + t1 * dx) as f32, (fy + t1 * dy) as f32),
  ))
}
