// 该文件是 Shouxie （手写识字） 项目的一部分。
// src/output/save_image_file.rs - 导出 28x28 图像文件
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

use std::path::{Path, PathBuf};

use image::GrayImage;
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  classify::Classification,
  output::Render,
  preprocess::{ClassifierPreprocessor, PreprocessError},
  url_path,
};

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("缩放错误: {0}")]
  PreprocessError(#[from] PreprocessError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 将画布缩小到分类器分辨率后保存，不做归一化
pub struct SaveImageFileOutput {
  path: PathBuf,
  preprocessor: ClassifierPreprocessor,
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(SaveImageFileOutput::new(url_path(uri)))
  }
}

impl SaveImageFileOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      preprocessor: ClassifierPreprocessor::default(),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn export(&self, raster: &GrayImage) -> Result<(), SaveImageFileError> {
    let small = self.preprocessor.downscale(raster)?;
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    small.save(&self.path)?;
    warn!("保存图像到文件: {}", self.path.display());

    Ok(())
  }
}

impl Render<GrayImage, Classification> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &GrayImage, _result: &Classification) -> Result<(), Self::Error> {
    self.export(frame)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{raster::RasterSurface, stroke::PointerSample};

  #[test]
  fn exports_a_28x28_png() {
    let dir = std::env::temp_dir().join(format!("shouxie-export-{}", std::process::id()));
    let path = dir.join("nested").join("digit.png");
    let output = SaveImageFileOutput::new(&path);

    let mut surface = RasterSurface::default();
    surface.begin_stroke(PointerSample::new(140.0, 40.0));
    surface.extend_stroke(PointerSample::new(140.0, 240.0));
    output.export(surface.as_image()).unwrap();

    let saved = image::open(&path).unwrap().to_luma8();
    assert_eq!(saved.dimensions(), (28, 28));
    assert!(saved.get_pixel(14, 14).0[0] > 128);
    assert_eq!(saved.get_pixel(2, 2).0[0], 0);

    std::fs::remove_dir_all(&dir).ok();
  }

  #[test]
  fn scheme_is_checked() {
    let url = Url::parse("folder:///tmp/x").unwrap();
    assert!(matches!(
      SaveImageFileOutput::from_url(&url),
      Err(SaveImageFileError::SchemeMismatch(_))
    ));
  }
}
