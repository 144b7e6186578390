// 该文件是 Shouxie （手写识字） 项目的一部分。
// src/preprocess.rs - 画布到分类器张量的预处理
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
use thiserror::Error;
use tracing::debug;

use crate::frame::{FrameError, NormalizedTensor, TENSOR_SIDE};

#[derive(Error, Debug)]
pub enum PreprocessError {
  #[error("输入图像为空: {0}x{1}")]
  EmptyImage(u32, u32),
  #[error("张量构造错误: {0}")]
  FrameError(#[from] FrameError),
}

/// 灰度画布 -> 双线性缩放 -> 除以 255 -> `[1, H, W, 1]`
///
/// 缩放为不对齐角点、不使用半像素中心的 `resize_bilinear`：
/// 目标像素 `(y, x)` 取源坐标 `(y * sh / H, x * sw / W)`，只混合相邻的 2×2 个源像素。
/// 缩小 10 倍时即逐点采样，不做抗锯齿平均。
#[derive(Debug, Clone, Copy, Default)]
pub struct ImagePreprocessor<const W: u32, const H: u32>;

pub type ClassifierPreprocessor = ImagePreprocessor<TENSOR_SIDE, TENSOR_SIDE>;

/// 一个轴上的采样位置：两个相邻源索引与插值权重
#[derive(Debug, Clone, Copy, PartialEq)]
struct Tap {
  low: u32,
  high: u32,
  weight: f32,
}

fn taps(source: u32, target: u32) -> Vec<Tap> {
  let scale = source as f32 / target as f32;
  (0..target)
    .map(|i| {
      let position = i as f32 * scale;
      let low = (position.floor() as u32).min(source - 1);
      Tap {
        low,
        high: (low + 1).min(source - 1),
        weight: position - low as f32,
      }
    })
    .collect()
}

impl<const W: u32, const H: u32> ImagePreprocessor<W, H> {
  /// 双线性缩放到目标分辨率，返回 0–255 的浮点强度，行优先
  pub fn resize(&self, image: &GrayImage) -> Result<Vec<f32>, PreprocessError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
      return Err(PreprocessError::EmptyImage(width, height));
    }
    debug!("缩放画布 {}x{} -> {}x{}", width, height, W, H);

    let at = |x: u32, y: u32| image.get_pixel(x, y).0[0] as f32;
    let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;
    let columns = taps(width, W);
    let mut resized = Vec::with_capacity(W as usize * H as usize);
    for row in taps(height, H) {
      for column in &columns {
        let top = lerp(at(column.low, row.low), at(column.high, row.low), column.weight);
        let bottom = lerp(at(column.low, row.high), at(column.high, row.high), column.weight);
        resized.push(lerp(top, bottom, row.weight));
      }
    }
    Ok(resized)
  }

  /// 缩放到目标分辨率，不做归一化（导出图片也使用这一步）
  pub fn downscale(&self, image: &GrayImage) -> Result<GrayImage, PreprocessError> {
    let resized = self.resize(image)?;
    Ok(GrayImage::from_fn(W, H, |x, y| {
      let value = resized[(y * W + x) as usize];
      Luma([value.round().clamp(0.0, 255.0) as u8])
    }))
  }

  pub fn normalize(&self, image: &GrayImage) -> Result<NormalizedTensor<W, H>, PreprocessError> {
    let data: Vec<f32> = image.pixels().map(|p| p.0[0] as f32 / 255.0).collect();
    Ok(NormalizedTensor::try_from(data)?)
  }

  pub fn preprocess(&self, image: &GrayImage) -> Result<NormalizedTensor<W, H>, PreprocessError> {
    let data: Vec<f32> = self
      .resize(image)?
      .into_iter()
      .map(|v| (v / 255.0).clamp(0.0, 1.0))
      .collect();
    Ok(NormalizedTensor::try_from(data)?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::AsNhwcTensor;
  use crate::raster::RasterSurface;
  use crate::stroke::PointerSample;

  #[test]
  fn output_shape_is_fixed_for_any_surface() {
    let preprocessor = ClassifierPreprocessor::default();
    for (w, h) in [(280, 280), (100, 37), (28, 28), (1, 1), (640, 480)] {
      let mut surface = RasterSurface::new(w, h);
      surface.begin_stroke(PointerSample::new(0.0, 0.0));
      surface.extend_stroke(PointerSample::new(w as f32, h as f32));
      let tensor = preprocessor.preprocess(surface.as_image()).unwrap();
      assert_eq!(tensor.shape(), [1, 28, 28, 1]);
      assert!(tensor.as_nhwc().iter().all(|v| (0.0..=1.0).contains(v)));
    }
  }

  #[test]
  fn empty_image_is_rejected() {
    let preprocessor = ClassifierPreprocessor::default();
    let image = GrayImage::new(0, 10);
    assert!(matches!(
      preprocessor.preprocess(&image),
      Err(PreprocessError::EmptyImage(0, 10))
    ));
  }

  #[test]
  fn cleared_surface_is_all_background() {
    let mut surface = RasterSurface::default();
    surface.begin_stroke(PointerSample::new(30.0, 30.0));
    surface.extend_stroke(PointerSample::new(250.0, 250.0));
    surface.clear();
    let tensor = ClassifierPreprocessor::default()
      .preprocess(surface.as_image())
      .unwrap();
    assert!(tensor.as_nhwc().iter().all(|&v| v == 0.0));
  }

  #[test]
  fn straight_stroke_stays_inside_its_padded_bounding_box() {
    let mut surface = RasterSurface::default();
    surface.begin_stroke(PointerSample::new(100.0, 60.0));
    surface.extend_stroke(PointerSample::new(100.0, 200.0));
    let tensor = ClassifierPreprocessor::default()
      .preprocess(surface.as_image())
      .unwrap();

    // 笔画包围盒 x: 92..=107, y: 52..=207，缩小 10 倍后再放宽一个像素
    let cols = 8..=11;
    let rows = 4..=21;
    for (y, x, v) in tensor.pixels() {
      if !cols.contains(&x) || !rows.contains(&y) {
        assert!(v < 0.05, "({}, {}) 处出现亮像素 {}", y, x, v);
      }
    }
    assert!(tensor.get(13, 10).unwrap() > 0.5);
  }

  #[test]
  fn ten_to_one_downscale_samples_single_pixels() {
    // 10 像素宽的竖条纹，缩小后每列恰好落在一条条纹的起点
    let stripes = GrayImage::from_fn(280, 280, |x, _| Luma([if (x / 10) % 2 == 0 { 255 } else { 0 }]));
    let tensor = ClassifierPreprocessor::default().preprocess(&stripes).unwrap();
    for x in 0..28 {
      let expected = if x % 2 == 0 { 1.0 } else { 0.0 };
      assert_eq!(tensor.get(14, x), Some(expected));
    }
  }

  #[test]
  fn fractional_positions_blend_two_neighbours() {
    // 4 -> 3：源坐标 0, 4/3, 8/3
    let ramp = GrayImage::from_fn(4, 1, |x, _| Luma([[0, 30, 90, 240][x as usize]]));
    let resized = ImagePreprocessor::<3, 1>.resize(&ramp).unwrap();
    let expected = [0.0, 30.0 + 60.0 / 3.0, 90.0 + 150.0 * 2.0 / 3.0];
    for (v, e) in resized.iter().zip(expected) {
      assert!((v - e).abs() < 1e-3, "{} != {}", v, e);
    }
  }

  #[test]
  fn upscale_clamps_at_the_last_pixel() {
    let image = GrayImage::from_fn(2, 2, |x, y| Luma([(x * 100 + y * 50) as u8]));
    let resized = ImagePreprocessor::<4, 4>.resize(&image).unwrap();
    // 源坐标 0, 0.5, 1, 1.5，最后两个都只取到第 1 列
    assert_eq!(&resized[..4], &[0.0, 50.0, 100.0, 100.0]);
    assert_eq!(resized[15], 150.0);
  }

  #[test]
  fn exported_image_normalizes_like_the_tensor() {
    let mut surface = RasterSurface::default();
    surface.begin_stroke(PointerSample::new(30.0, 200.0));
    surface.extend_stroke(PointerSample::new(250.0, 75.0));
    let preprocessor = ClassifierPreprocessor::default();
    let direct = preprocessor.preprocess(surface.as_image()).unwrap();
    let exported = preprocessor
      .normalize(&preprocessor.downscale(surface.as_image()).unwrap())
      .unwrap();
    for ((_, _, a), (_, _, b)) in direct.pixels().zip(exported.pixels()) {
      assert!((a - b).abs() <= 0.5 / 255.0 + 1e-6);
    }
  }

  #[test]
  fn full_white_maps_to_one() {
    let image = GrayImage::from_pixel(280, 280, image::Luma([255]));
    let tensor = ClassifierPreprocessor::default().preprocess(&image).unwrap();
    assert!(tensor.as_nhwc().iter().all(|&v| (v - 1.0).abs() < 1e-6));
  }

  #[test]
  fn downscale_keeps_integer_intensities() {
    let mut surface = RasterSurface::default();
    surface.begin_stroke(PointerSample::new(140.0, 20.0));
    surface.extend_stroke(PointerSample::new(140.0, 260.0));
    let small = ClassifierPreprocessor::default()
      .downscale(surface.as_image())
      .unwrap();
    assert_eq!(small.dimensions(), (28, 28));
    assert!(small.get_pixel(14, 14).0[0] > 128);
    assert_eq!(small.get_pixel(0, 0).0[0], 0);
  }
}
