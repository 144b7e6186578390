// 该文件是 Shouxie （手写识字） 项目的一部分。
// src/main.rs - 项目主程序
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
use clap::{Parser, ValueEnum};
use tracing::{error, info};
use url::Url;

use shouxie::{
  FromUrl,
  classify::ClassificationOrchestrator,
  input::InputWrapper,
  label::{LabelMapping, LetterOrder},
  model::{Model, ModelWrapper},
  output::OutputWrapper,
  session::DrawingSession,
  task::{ContinuousTask, OneShotTask, PerStrokeTask, Task},
};

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum Mode {
  /// 回放全部笔画后分类一次
  #[default]
  Oneshot,
  /// 每抬笔一次分类一次
  PerStroke,
  /// 逐笔分类，Ctrl-C 退出
  Continuous,
}

/// Shouxie 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型地址，如 emnist:///models/emnist.pt
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源，如 strokes:///tmp/events.jsonl 或 stdin:
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出，如 console: 或 folder:///tmp/records
  #[arg(long, value_name = "OUTPUT", default_value = "console:")]
  pub output: Url,

  #[arg(long, value_enum, default_value_t = Mode::Oneshot)]
  pub mode: Mode,

  /// 字母类别顺序: upper-first 或 lower-first
  #[arg(long, value_name = "ORDER", default_value_t = LetterOrder::UpperFirst)]
  pub letter_order: LetterOrder,

  /// 连续模式下处理的最大笔画数
  #[arg(long, value_name = "STROKE_NUMBER")]
  pub stroke_number: Option<usize>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型地址: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);
  info!("运行模式: {:?}, 字母顺序: {}", args.mode, args.letter_order);

  let input = InputWrapper::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;

  let mut session = DrawingSession::default();
  match ModelWrapper::from_url(&args.model) {
    Ok(model) => {
      let label_set = model.kind().label_set();
      info!("模型类别数: {}", label_set.class_count());
      session.switch_model(Some(
        ClassificationOrchestrator::new(model, label_set)
          .with_mapping(LabelMapping::new(args.letter_order)),
      ));
    }
    // 模型不可用时仍然回放笔画，分类时报告错误
    Err(e) => error!("模型加载失败: {}", e),
  }

  run(args.mode, args.stroke_number, input, &mut session, output)
}

fn run<M, E>(
  mode: Mode,
  stroke_number: Option<usize>,
  input: InputWrapper,
  session: &mut DrawingSession<M>,
  output: OutputWrapper,
) -> Result<()>
where
  M: Model<
      Input = shouxie::frame::ClassifierTensor,
      Output = shouxie::model::Scores,
      Error = E,
    > + Send
    + Sync
    + 'static,
  E: std::error::Error + Send + Sync + 'static,
{
  let events = input.into_events();
  match mode {
    Mode::Oneshot => OneShotTask.run_task(events, session, output),
    Mode::PerStroke => PerStrokeTask.run_task(events, session, output),
    Mode::Continuous => ContinuousTask::default()
      .with_stroke_number(stroke_number)
      .run_task(events, session, output),
  }
}
