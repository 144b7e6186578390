// 该文件是 Shouxie （手写识字） 项目的一部分。
// src/task.rs - 任务调度
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

use std::{sync::mpsc, thread, time::Duration};

use image::GrayImage;
use tracing::{debug, info, warn};

use crate::{
  classify::Classification,
  frame::ClassifierTensor,
  input::PointerEvent,
  model::{Model, Scores},
  output::Render,
  session::{ClassificationOutcome, DrawingSession},
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, session: &mut DrawingSession<M>, output: O) -> Result<(), Self::Error>;
}

/// 回放全部事件，最后分类一次
pub struct OneShotTask;

impl<
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = PointerEvent>,
  M: Model<Input = ClassifierTensor, Output = Scores, Error = ME> + Send + Sync + 'static,
  O: Render<GrayImage, Classification, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, session: &mut DrawingSession<M>, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let mut events = 0usize;
    for event in input {
      session.handle_event(event);
      events += 1;
    }
    info!("共处理 {} 个输入事件，开始分类...", events);
    if session.surface().is_blank() {
      warn!("画布为空，仍然执行分类");
    }

    let now = std::time::Instant::now();
    let frame = session.surface().snapshot();
    let result = session.classify()?;
    let elapsed = now.elapsed();
    info!("分类完成，耗时: {:.2?}", elapsed);
    output.render_result(&frame, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

/// 每抬笔一次就在后台分类当前画布
#[derive(Default, Debug)]
pub struct PerStrokeTask;

impl<
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = PointerEvent>,
  M: Model<Input = ClassifierTensor, Output = Scores, Error = ME> + Send + Sync + 'static,
  O: Render<GrayImage, Classification, Error = RE>,
> Task<I, M, O> for PerStrokeTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, session: &mut DrawingSession<M>, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let strokes = run_strokes(input, session, &output, None, || false)?;
    info!("任务完成，共 {} 笔", strokes);
    Ok(())
  }
}

/// 与逐笔分类相同，直到 Ctrl-C 或达到指定笔画数
#[derive(Default, Debug)]
pub struct ContinuousTask {
  stroke_number: Option<usize>,
}

impl ContinuousTask {
  pub fn with_stroke_number(mut self, stroke_number: Option<usize>) -> Self {
    self.stroke_number = stroke_number;
    self
  }
}

impl<
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = PointerEvent>,
  M: Model<Input = ClassifierTensor, Output = Scores, Error = ME> + Send + Sync + 'static,
  O: Render<GrayImage, Classification, Error = RE>,
> Task<I, M, O> for ContinuousTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, session: &mut DrawingSession<M>, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let (tx, rx) = mpsc::channel();

    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })?;

    let strokes = run_strokes(input, session, &output, self.stroke_number, || {
      rx.try_recv().is_ok()
    })?;

    info!("任务完成，共 {} 笔，退出", strokes);
    Ok(())
  }
}

/// 逐笔驱动会话：抬笔时启动后台分类，下一笔结束前取回并渲染上一次结果
fn run_strokes<I, M, ME, O, RE>(
  input: I,
  session: &mut DrawingSession<M>,
  output: &O,
  stroke_number: Option<usize>,
  mut interrupted: impl FnMut() -> bool,
) -> anyhow::Result<usize>
where
  I: Iterator<Item = PointerEvent>,
  M: Model<Input = ClassifierTensor, Output = Scores, Error = ME> + Send + Sync + 'static,
  ME: std::error::Error + Sync + Send + 'static,
  O: Render<GrayImage, Classification, Error = RE>,
  RE: std::error::Error + Sync + Send + 'static,
{
  let mut stroke_index = 0usize;
  for event in input {
    if event == PointerEvent::Clear && session.has_pending() {
      // 重置会丢弃尚未完成的分类，先把它取回
      render_outcome(session.wait_classification(), output)?;
    }
    let stroke_ended = session.handle_event(event);
    render_outcome(session.poll_classification(), output)?;

    if stroke_ended {
      stroke_index += 1;
      debug!("第 {} 笔结束", stroke_index);
      render_outcome(session.wait_classification(), output)?;
      session.start_classification()?;

      if stroke_number.is_some_and(|n| stroke_index >= n) {
        info!("达到指定笔画数 {}, 退出任务循环", stroke_index);
        break;
      }
    }
    if interrupted() {
      warn!("中断信号接收，退出任务循环");
      break;
    }
  }
  render_outcome(session.wait_classification(), output)?;
  Ok(stroke_index)
}

fn render_outcome<O, RE>(outcome: Option<ClassificationOutcome>, output: &O) -> anyhow::Result<()>
where
  O: Render<GrayImage, Classification, Error = RE>,
  RE: std::error::Error + Sync + Send + 'static,
{
  let Some(outcome) = outcome else {
    return Ok(());
  };
  let result = outcome.result?;
  output.render_result(&outcome.snapshot, &result)?;
  Ok(())
}
