// 该文件是 Shouxie （手写识字） 项目的一部分。
// src/label.rs - 类别索引到字符的映射
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

use std::{fmt, str::FromStr};

use thiserror::Error;

const DIGITS: &str = "0123456789";
const UPPER_CASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER_CASE: &str = "abcdefghijklmnopqrstuvwxyz";

pub const DIGIT_COUNT: usize = 10;
pub const LETTER_COUNT: usize = 26;
/// 数字 + 两种大小写字母
pub const CLASS_COUNT: usize = DIGIT_COUNT + 2 * LETTER_COUNT;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LabelError {
  #[error("类别索引越界: {index}, 有效范围 [0, {count})")]
  OutOfRange { index: usize, count: usize },
  #[error("字符不在标签表中: {0:?}")]
  UnknownCharacter(char),
  #[error("未知的字母顺序: {0}")]
  UnknownOrder(String),
}

/// 10 之后两段字母的先后顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LetterOrder {
  /// 10–35 为大写，36–61 为小写（EMNIST ByClass 的训练顺序）
  #[default]
  UpperFirst,
  LowerFirst,
}

impl FromStr for LetterOrder {
  type Err = LabelError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "upper-first" | "upper" => Ok(LetterOrder::UpperFirst),
      "lower-first" | "lower" => Ok(LetterOrder::LowerFirst),
      other => Err(LabelError::UnknownOrder(other.to_string())),
    }
  }
}

impl fmt::Display for LetterOrder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LetterOrder::UpperFirst => write!(f, "upper-first"),
      LetterOrder::LowerFirst => write!(f, "lower-first"),
    }
  }
}

/// 模型输出覆盖的类别集合，均为同一顺序的前缀
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSet {
  Digits,
  Alphanumeric,
}

impl LabelSet {
  pub fn class_count(&self) -> usize {
    match self {
      LabelSet::Digits => DIGIT_COUNT,
      LabelSet::Alphanumeric => CLASS_COUNT,
    }
  }
}

/// 固定的 62 字符全序，纯函数，无状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LabelMapping {
  order: LetterOrder,
}

impl LabelMapping {
  pub fn new(order: LetterOrder) -> Self {
    Self { order }
  }

  pub fn order(&self) -> LetterOrder {
    self.order
  }

  fn letter_ranges(&self) -> (&'static str, &'static str) {
    match self.order {
      LetterOrder::UpperFirst => (UPPER_CASE, LOWER_CASE),
      LetterOrder::LowerFirst => (LOWER_CASE, UPPER_CASE),
    }
  }

  pub fn decode(&self, class_index: usize) -> Result<char, LabelError> {
    let (first, second) = self.letter_ranges();
    let table = match class_index {
      i if i < DIGIT_COUNT => DIGITS.as_bytes()[i],
      i if i < DIGIT_COUNT + LETTER_COUNT => first.as_bytes()[i - DIGIT_COUNT],
      i if i < CLASS_COUNT => second.as_bytes()[i - DIGIT_COUNT - LETTER_COUNT],
      index => {
        return Err(LabelError::OutOfRange {
          index,
          count: CLASS_COUNT,
        });
      }
    };
    Ok(table as char)
  }

  pub fn encode(&self, character: char) -> Result<usize, LabelError> {
    let (first, second) = self.letter_ranges();
    let position = |table: &str| table.find(character);
    if let Some(i) = position(DIGITS) {
      Ok(i)
    } else if let Some(i) = position(first) {
      Ok(DIGIT_COUNT + i)
    } else if let Some(i) = position(second) {
      Ok(DIGIT_COUNT + LETTER_COUNT + i)
    } else {
      Err(LabelError::UnknownCharacter(character))
    }
  }
}

/// 默认顺序下的解码
pub fn decode(class_index: usize) -> Result<char, LabelError> {
  LabelMapping::default().decode(class_index)
}
