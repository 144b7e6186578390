// 该文件是 Shouxie （手写识字） 项目的一部分。
// src/bin/export_digit.rs - 导出 28×28 手写图像
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

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use url::Url;

use shouxie::{
  FromUrl, input::InputWrapper, model::ModelWrapper, output::SaveImageFileOutput,
  session::DrawingSession,
};

/// 回放笔画并导出缩小后的图像，不需要模型
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入来源，如 strokes:///tmp/events.jsonl
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出图像，如 image:///tmp/digit.png
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = InputWrapper::from_url(&args.input)?;
  let output = SaveImageFileOutput::from_url(&args.output)?;

  let mut session: DrawingSession<ModelWrapper> = DrawingSession::default();
  let strokes = input
    .into_events()
    .filter(|event| session.handle_event(*event))
    .count();
  info!("回放完成，共 {} 笔", strokes);
  if session.surface().is_blank() {
    warn!("画布为空，导出全黑图像");
  }

  output.export(session.surface().as_image())?;
  info!("已导出: {}", output.path().display());

  Ok(())
}
