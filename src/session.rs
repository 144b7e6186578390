// 该文件是 Shouxie （手写识字） 项目的一部分。
// src/session.rs - 绘制会话
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

use std::{
  sync::Arc,
  thread::{self, JoinHandle},
};

use image::GrayImage;
use tracing::{debug, info, warn};

use crate::{
  classify::{Classification, ClassificationError, ClassificationOrchestrator},
  frame::ClassifierTensor,
  input::PointerEvent,
  model::{Model, Scores},
  raster::RasterSurface,
  stroke::{PointerSample, StrokeSegment},
};

/// 后台线程中的一次分类，输入为启动时的画布快照
pub struct PendingClassification {
  snapshot: Arc<GrayImage>,
  handle: JoinHandle<Result<Classification, ClassificationError>>,
}

/// 完成的分类及其对应的画布快照
#[derive(Debug)]
pub struct ClassificationOutcome {
  pub snapshot: Arc<GrayImage>,
  pub result: Result<Classification, ClassificationError>,
}

impl PendingClassification {
  pub fn snapshot(&self) -> &GrayImage {
    &self.snapshot
  }

  pub fn is_finished(&self) -> bool {
    self.handle.is_finished()
  }

  pub fn wait(self) -> ClassificationOutcome {
    let result = self
      .handle
      .join()
      .unwrap_or(Err(ClassificationError::TaskPanicked));
    ClassificationOutcome {
      snapshot: self.snapshot,
      result,
    }
  }
}

/// 画布、锚点、绘制状态与当前模型
pub struct DrawingSession<M> {
  surface: RasterSurface,
  drawing: bool,
  orchestrator: Option<Arc<ClassificationOrchestrator<M>>>,
  pending: Option<PendingClassification>,
  last_result: Option<Classification>,
}

impl<M> Default for DrawingSession<M> {
  fn default() -> Self {
    Self::new(RasterSurface::default())
  }
}

impl<M> DrawingSession<M> {
  pub fn new(surface: RasterSurface) -> Self {
    Self {
      surface,
      drawing: false,
      orchestrator: None,
      pending: None,
      last_result: None,
    }
  }

  pub fn with_orchestrator(mut self, orchestrator: ClassificationOrchestrator<M>) -> Self {
    self.orchestrator = Some(Arc::new(orchestrator));
    self
  }

  pub fn surface(&self) -> &RasterSurface {
    &self.surface
  }

  pub fn is_drawing(&self) -> bool {
    self.drawing
  }

  pub fn has_model(&self) -> bool {
    self.orchestrator.is_some()
  }

  pub fn has_pending(&self) -> bool {
    self.pending.is_some()
  }

  pub fn last_result(&self) -> Option<&Classification> {
    self.last_result.as_ref()
  }

  /// 按到达顺序处理事件，返回是否刚结束一笔
  pub fn handle_event(&mut self, event: PointerEvent) -> bool {
    match event {
      PointerEvent::Down(point) => {
        self.pointer_down(point);
        false
      }
      PointerEvent::Move(point) => {
        self.pointer_move(point);
        false
      }
      PointerEvent::Up => self.pointer_up(),
      PointerEvent::Clear => {
        self.reset();
        false
      }
    }
  }

  pub fn pointer_down(&mut self, point: PointerSample) {
    self.drawing = true;
    self.surface.begin_stroke(point);
  }

  pub fn pointer_move(&mut self, point: PointerSample) {
    if !self.drawing {
      return;
    }
    let anchor = self.surface.anchor().unwrap_or(point);
    // 只对画布内可见的部分插值，画布外的远点不会产生大量采样
    if let Some((from, to)) = self.surface.visible_segment(anchor, point) {
      for sample in StrokeSegment::new(from, to).interpolate() {
        self.surface.extend_stroke(sample);
      }
      self.surface.extend_stroke(to);
    }
    self.surface.extend_stroke(point);
  }

  pub fn pointer_up(&mut self) -> bool {
    let was_drawing = self.drawing;
    self.drawing = false;
    self.surface.end_stroke();
    was_drawing
  }

  /// 清空画布与上一次结果，丢弃未完成的分类
  pub fn reset(&mut self) {
    debug!("重置画布");
    self.surface.clear();
    self.drawing = false;
    self.last_result = None;
    if self.pending.take().is_some() {
      warn!("丢弃未完成的分类");
    }
  }

  /// 切换模型总是伴随完整的重置；`None` 表示加载失败，绘制仍可继续
  pub fn switch_model(&mut self, orchestrator: Option<ClassificationOrchestrator<M>>) {
    info!("切换模型");
    self.reset();
    self.orchestrator = orchestrator.map(Arc::new);
  }
}

impl<M, E> DrawingSession<M>
where
  M: Model<Input = ClassifierTensor, Output = Scores, Error = E> + Send + Sync + 'static,
  E: std::error::Error + Send + Sync + 'static,
{
  /// 同步分类当前画布
  pub fn classify(&mut self) -> Result<Classification, ClassificationError> {
    let orchestrator = self
      .orchestrator
      .as_ref()
      .ok_or(ClassificationError::ModelUnavailable)?;
    let result = orchestrator.classify(self.surface.as_image())?;
    self.last_result = Some(result.clone());
    Ok(result)
  }

  /// 先同步复制画布，再在后台线程中分类；之后的绘制不影响本次结果
  pub fn classify_async(&self) -> Result<PendingClassification, ClassificationError> {
    let orchestrator = Arc::clone(
      self
        .orchestrator
        .as_ref()
        .ok_or(ClassificationError::ModelUnavailable)?,
    );
    let snapshot = Arc::new(self.surface.snapshot());
    let frame = Arc::clone(&snapshot);
    let handle = thread::spawn(move || orchestrator.classify(&frame));
    Ok(PendingClassification { snapshot, handle })
  }

  /// 启动由会话持有的后台分类，替换尚未完成的旧任务
  pub fn start_classification(&mut self) -> Result<(), ClassificationError> {
    let pending = self.classify_async()?;
    if self.pending.replace(pending).is_some() {
      debug!("旧的分类任务被替换");
    }
    Ok(())
  }

  /// 非阻塞地取回结果
  pub fn poll_classification(&mut self) -> Option<ClassificationOutcome> {
    if !self.pending.as_ref()?.is_finished() {
      return None;
    }
    self.finish_pending()
  }

  /// 阻塞等待结果
  pub fn wait_classification(&mut self) -> Option<ClassificationOutcome> {
    self.finish_pending()
  }

  fn finish_pending(&mut self) -> Option<ClassificationOutcome> {
    let outcome = self.pending.take()?.wait();
    if let Ok(classification) = &outcome.result {
      self.last_result = Some(classification.clone());
    }
    Some(outcome)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::mpsc;
  use std::sync::Mutex;

  use super::*;
  use crate::label::LabelSet;

  #[derive(Debug, thiserror::Error)]
  #[error("never")]
  struct Never;

  /// 画布有笔画时输出 '1'，否则输出 '0'
  struct InkDetector;

  impl Model for InkDetector {
    type Input = ClassifierTensor;
    type Output = Scores;
    type Error = Never;

    fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
      let mut scores = vec![0.0; 10];
      scores[usize::from(input.max_value() > 0.0)] = 4.0;
      Ok(scores.into_boxed_slice())
    }
  }

  /// 推理前等待放行信号
  struct Gated {
    gate: Mutex<mpsc::Receiver<()>>,
  }

  impl Model for Gated {
    type Input = ClassifierTensor;
    type Output = Scores;
    type Error = Never;

    fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
      self.gate.lock().unwrap().recv().ok();
      InkDetector.infer(input)
    }
  }

  fn session() -> DrawingSession<InkDetector> {
    DrawingSession::default()
      .with_orchestrator(ClassificationOrchestrator::new(InkDetector, LabelSet::Digits))
  }

  #[test]
  fn move_without_down_draws_nothing() {
    let mut session = session();
    session.pointer_move(PointerSample::new(50.0, 50.0));
    assert!(session.surface().is_blank());
  }

  #[test]
  fn first_move_at_down_point_paints_a_dot() {
    let mut session = session();
    session.pointer_down(PointerSample::new(60.0, 60.0));
    assert!(session.surface().is_blank());
    session.pointer_move(PointerSample::new(60.0, 60.0));
    assert!(!session.surface().is_blank());
  }

  #[test]
  fn stroke_is_continuous_between_samples() {
    let mut session = session();
    session.handle_event(PointerEvent::Down(PointerSample::new(40.0, 140.0)));
    session.handle_event(PointerEvent::Move(PointerSample::new(240.0, 140.0)));
    assert!(session.handle_event(PointerEvent::Up));
    let image = session.surface().as_image();
    assert!((40..=240).all(|x| image.get_pixel(x, 140).0[0] == 255));
    assert!(!session.is_drawing());
    assert!(session.surface().anchor().is_none());
    assert!(!session.handle_event(PointerEvent::Up));
  }

  #[test]
  fn clear_event_resets_everything() {
    let mut session = session();
    session.handle_event(PointerEvent::Down(PointerSample::new(40.0, 40.0)));
    session.handle_event(PointerEvent::Move(PointerSample::new(80.0, 80.0)));
    session.classify().unwrap();
    assert!(session.last_result().is_some());
    session.handle_event(PointerEvent::Clear);
    assert!(session.surface().is_blank());
    assert!(!session.is_drawing());
    assert!(session.last_result().is_none());
  }

  #[test]
  fn classify_without_model_fails_but_drawing_continues() {
    let mut session: DrawingSession<InkDetector> = DrawingSession::default();
    session.pointer_down(PointerSample::new(10.0, 10.0));
    session.pointer_move(PointerSample::new(30.0, 10.0));
    assert!(matches!(
      session.classify(),
      Err(ClassificationError::ModelUnavailable)
    ));
    assert!(!session.surface().is_blank());
  }

  #[test]
  fn far_off_canvas_moves_are_clipped() {
    let mut session = session();
    session.pointer_down(PointerSample::new(140.0, 140.0));
    session.pointer_move(PointerSample::new(1.0e12, 140.0));
    let image = session.surface().as_image();
    assert!((140..280).all(|x| image.get_pixel(x, 140).0[0] == 255));
    assert_eq!(session.surface().anchor(), Some(PointerSample::new(1.0e12, 140.0)));

    // 从远处回到画布内，再经过两个方向的远点
    session.pointer_move(PointerSample::new(20.0, 20.0));
    assert_eq!(image_at(&session, 20, 20), 255);
    assert_eq!(image_at(&session, 270, 20), 255);
    assert_eq!(image_at(&session, 10, 20), 0);
    session.pointer_move(PointerSample::new(-1.0e12, -3.0e11));
    session.pointer_move(PointerSample::new(5.0e11, 9.0e12));
    session.pointer_move(PointerSample::new(f32::INFINITY, 10.0));
    session.pointer_move(PointerSample::new(f32::NAN, f32::NAN));
    session.pointer_move(PointerSample::new(f32::MAX, f32::MIN));
    assert!(session.pointer_up());
    assert!(!session.is_drawing());

    // 非法坐标之后仍可继续绘制
    session.pointer_down(PointerSample::new(200.0, 250.0));
    session.pointer_move(PointerSample::new(260.0, 250.0));
    assert_eq!(image_at(&session, 230, 250), 255);
  }

  fn image_at(session: &DrawingSession<InkDetector>, x: u32, y: u32) -> u8 {
    session.surface().as_image().get_pixel(x, y).0[0]
  }

  #[test]
  fn async_classification_uses_the_snapshot() {
    let (tx, rx) = mpsc::channel();
    let model = Gated {
      gate: Mutex::new(rx),
    };
    let mut session =
      DrawingSession::default().with_orchestrator(ClassificationOrchestrator::new(model, LabelSet::Digits));

    // 空白画布上启动分类，然后继续绘制
    session.start_classification().unwrap();
    session.pointer_down(PointerSample::new(100.0, 100.0));
    session.pointer_move(PointerSample::new(180.0, 180.0));
    tx.send(()).unwrap();

    let outcome = session.wait_classification().unwrap();
    assert!(outcome.snapshot.pixels().all(|p| p.0[0] == 0));
    let result = outcome.result.unwrap();
    assert_eq!(result.character, '0');
    assert_eq!(session.last_result(), Some(&result));
    assert!(!session.has_pending());
    assert!(!session.surface().is_blank());
  }

  #[test]
  fn switching_model_discards_pending_work() {
    let (tx, rx) = mpsc::channel();
    let mut session = DrawingSession::default().with_orchestrator(ClassificationOrchestrator::new(
      Gated {
        gate: Mutex::new(rx),
      },
      LabelSet::Digits,
    ));
    session.pointer_down(PointerSample::new(100.0, 100.0));
    session.pointer_move(PointerSample::new(120.0, 100.0));
    session.start_classification().unwrap();
    assert!(session.has_pending());

    session.switch_model(None);
    tx.send(()).ok();
    assert!(!session.has_pending());
    assert!(!session.has_model());
    assert!(session.surface().is_blank());
    assert!(session.wait_classification().is_none());
  }

  #[test]
  fn poll_returns_none_while_running() {
    let (tx, rx) = mpsc::channel();
    let mut session = DrawingSession::default().with_orchestrator(ClassificationOrchestrator::new(
      Gated {
        gate: Mutex::new(rx),
      },
      LabelSet::Digits,
    ));
    assert!(session.poll_classification().is_none());
    session.start_classification().unwrap();
    assert!(session.poll_classification().is_none());
    tx.send(()).unwrap();
    let result = session.wait_classification().unwrap().result.unwrap();
    assert_eq!(result.character, '0');
  }
}
