// 该文件是 Shouxie （手写识字） 项目的一部分。
// tests/pipeline.rs - 从指针事件到字符的端到端测试
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

use std::sync::{Arc, Mutex};

use shouxie::{
  classify::{ClassificationOrchestrator, softmax},
  frame::ClassifierTensor,
  input::{CanvasOrigin, PointerEvent, StrokeFileInput},
  label::LabelSet,
  model::{Model, Scores},
  session::DrawingSession,
  stroke::PointerSample,
};

#[derive(Debug, thiserror::Error)]
#[error("never")]
struct Never;

/// 记录收到的张量，并返回在 0 号类别处取峰值的分数
struct PeakAtZero {
  seen: Arc<Mutex<Option<ClassifierTensor>>>,
}

const LOGITS: [f32; 4] = [6.0, 1.0, 0.5, -2.0];

impl Model for PeakAtZero {
  type Input = ClassifierTensor;
  type Output = Scores;
  type Error = Never;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    *self.seen.lock().unwrap() = Some(input.clone());
    let mut scores = vec![0.0; 62];
    scores[..LOGITS.len()].copy_from_slice(&LOGITS);
    Ok(scores.into_boxed_slice())
  }
}

/// 以画布中心为圆心的闭合圆环，鼠标事件
fn closed_loop() -> String {
  let mut lines = Vec::new();
  let (cx, cy, r) = (140.0f32, 140.0f32, 80.0f32);
  for step in 0..=72 {
    let angle = (step as f32 * 5.0).to_radians();
    let (x, y) = (cx + r * angle.cos(), cy + r * angle.sin());
    let phase = if step == 0 { "down" } else { "move" };
    lines.push(format!(
      r#"{{"source":"mouse","phase":"{phase}","offset_x":{x},"offset_y":{y}}}"#
    ));
  }
  lines.push(r#"{"source":"mouse","phase":"up","offset_x":0,"offset_y":0}"#.to_string());
  lines.join("\n")
}

#[test]
fn closed_loop_is_classified_as_zero() {
  let seen = Arc::new(Mutex::new(None));
  let model = PeakAtZero { seen: seen.clone() };
  let mut session = DrawingSession::default()
    .with_orchestrator(ClassificationOrchestrator::new(model, LabelSet::Alphanumeric));

  let input = StrokeFileInput::from_text(&closed_loop(), CanvasOrigin::default());
  let strokes = input
    .into_events()
    .filter(|event| session.handle_event(*event))
    .count();
  assert_eq!(strokes, 1);

  let result = session.classify().unwrap();
  let mut scores = vec![0.0; 62];
  scores[..LOGITS.len()].copy_from_slice(&LOGITS);
  let expected = (softmax(&scores)[0] as f64 * 100.0 * 100.0).round() / 100.0;
  assert_eq!(result.character, '0');
  assert_eq!(result.prediction.class_index, 0);
  assert!((result.confidence_percent - expected).abs() < 1e-9);

  let tensor = seen.lock().unwrap().take().unwrap();
  // 圆环经过 (220, 140)，对应张量 (14, 22)；圆心保持黑色
  assert!(tensor.get(14, 22).unwrap() > 0.3);
  assert_eq!(tensor.get(14, 14), Some(0.0));
  assert!(tensor.pixels().all(|(_, _, v)| (0.0..=1.0).contains(&v)));
}

#[test]
fn async_classification_ignores_later_strokes() {
  let seen = Arc::new(Mutex::new(None));
  let model = PeakAtZero { seen: seen.clone() };
  let mut session = DrawingSession::default()
    .with_orchestrator(ClassificationOrchestrator::new(model, LabelSet::Alphanumeric));

  let pending = session.classify_async().unwrap();
  session.handle_event(PointerEvent::Down(PointerSample::new(140.0, 20.0)));
  session.handle_event(PointerEvent::Move(PointerSample::new(140.0, 260.0)));
  session.handle_event(PointerEvent::Up);

  let outcome = pending.wait();
  assert_eq!(outcome.result.unwrap().character, '0');
  assert!(outcome.snapshot.pixels().all(|p| p.0[0] == 0));
  assert_eq!(seen.lock().unwrap().take().unwrap().max_value(), 0.0);
  assert!(!session.surface().is_blank());
}

#[test]
fn reset_clears_the_canvas() {
  let mut session: DrawingSession<PeakAtZero> = DrawingSession::default();
  let input = StrokeFileInput::from_text(&closed_loop(), CanvasOrigin::default());
  for event in input.into_events() {
    session.handle_event(event);
  }
  assert!(!session.surface().is_blank());
  session.handle_event(PointerEvent::Clear);
  assert!(session.surface().is_blank());
  assert!(session.surface().anchor().is_none());
}
