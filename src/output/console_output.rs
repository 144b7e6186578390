// 该文件是 Shouxie （手写识字） 项目的一部分。
// src/output/console_output.rs - 终端输出
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

use image::GrayImage;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, classify::Classification, output::Render};

#[derive(Error, Debug)]
pub enum ConsoleOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

/// 把识别结果打印到标准输出，`console:?top=3` 额外列出前几名
pub struct ConsoleOutput {
  top: usize,
}

impl FromUrlWithScheme for ConsoleOutput {
  const SCHEME: &'static str = "console";
}

impl FromUrl for ConsoleOutput {
  type Error = ConsoleOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ConsoleOutputError::SchemeMismatch);
    }
    let top = url
      .query_pairs()
      .find(|(k, _)| k == "top")
      .and_then(|(_, v)| v.parse().ok())
      .unwrap_or(0);
    Ok(ConsoleOutput { top })
  }
}

impl ConsoleOutput {
  pub fn format(&self, result: &Classification) -> String {
    let mut text = format!(
      "预测字符: {}, 置信度: {:.2}%",
      result.character, result.confidence_percent
    );
    for (index, p) in top_k(&result.prediction.confidence, self.top) {
      text.push_str(&format!("\n  - 类别 {}: {:.2}%", index, p * 100.0));
    }
    text
  }
}

fn top_k(confidence: &[f32], k: usize) -> Vec<(usize, f32)> {
  let mut ranked: Vec<(usize, f32)> = confidence.iter().copied().enumerate().collect();
  ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
  ranked.truncate(k);
  ranked
}

impl Render<GrayImage, Classification> for ConsoleOutput {
  type Error = ConsoleOutputError;

  fn render_result(&self, _frame: &GrayImage, result: &Classification) -> Result<(), Self::Error> {
    info!("输出识别结果: {}", result.character);
    println!("{}", self.format(result));
    Ok(())
  }
}
