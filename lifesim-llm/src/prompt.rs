//! Prompt building blocks.
//!
//! Every prompt sent to the oracle is assembled from five layers:
//!
//! ```text
//! ### Role ###           persona
//! ### World Context ###  macro environment, current plot
//! ### User Profile ###   the simulated person
//! ### Task ###           what to produce
//! ### Constraints ###    language and format guardrails
//! ```
//!
//! Empty optional layers are omitted. The texts below are the built-in
//! personas and guardrails; task texts live with the code that uses them.

use lifesim_core::types::Difficulty;

// ---------------------------------------------------------------------------
// Personas
// ---------------------------------------------------------------------------

/// Narrator: cinematic, melancholic, grounded in everyday detail.
pub const PERSONA_NARRATOR: &str = "你是一个名为'DeepLife'的残酷人生模拟引擎。你的文字冷静而有电影感，\
善用意象（雨夜、樱花、高架桥、废墟）来承载情绪。你关注少年的心气与成年后的妥协，\
不要平铺直叙，要让情绪在字里行间流动。";

/// Psychologist: reads fears and desires out of plain data.
pub const PERSONA_PSYCHOLOGIST: &str = "你是一位深刻的心理侧写师，能从冰冷的数据中看见一个人的恐惧与渴望。\
你关注的不只是家庭背景，还有职业抱负、道德困境、亲密关系和自我实现。";

/// Historian: one-line summaries of the macro tide.
pub const PERSONA_HISTORIAN: &str = "你是一位研究近未来的历史学家，擅长用一句话概括一个时代的洪流。";

/// Judge: pure probability and logic.
pub const PERSONA_JUDGE: &str = "你是一位绝对理性的命运裁判官，只看概率与逻辑，不讲情面。";

/// NPC engine: simulates the people around the protagonist.
pub const PERSONA_NPC_ENGINE: &str = "你是一个社会关系模拟器，负责推演主角身边每个人的生活。";

/// Biographer: keeps only what shapes a life.
pub const PERSONA_BIOGRAPHER: &str = "你是一位克制的传记作者，只记录真正改变一个人命运的事情。";

/// Game designer: part actuary, part screenwriter.
pub const PERSONA_GAME_DESIGNER: &str = "你是一个精算师与编剧的结合体。";

// ---------------------------------------------------------------------------
// Guardrails
// ---------------------------------------------------------------------------

/// Simplified Chinese, no chain of thought, no preamble.
pub const GUARDRAIL_CHINESE_ONLY: &str = "【强制约束】\n1. 必须完全使用简体中文回复。\n\
2. 禁止输出任何思考过程或思维链。\n3. 直接输出最终结果，不要包含任何前言后语。";

/// Bare JSON array of strings.
pub const GUARDRAIL_JSON_ARRAY: &str = "【格式约束】\n1. 必须返回纯 JSON 数组格式字符串。\n\
2. 格式示例：[\"选项A\", \"选项B\", \"选项C\"]。\n3. 不要使用 Markdown 标记（如 ```json）。\n\
4. 确保 JSON 格式合法。";

/// Bare JSON object.
pub const GUARDRAIL_JSON_OBJECT: &str = "【格式约束】\n1. 必须返回纯 JSON 对象格式字符串。\n\
2. 不要使用 Markdown 标记。\n3. 确保 JSON 格式合法。";

// ---------------------------------------------------------------------------
// Difficulty tone
// ---------------------------------------------------------------------------

/// Tone instruction for narrative prompts.
#[must_use]
pub fn narrative_difficulty(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "【模式设定】当前为爽文模式（一路开挂）。请多给予好运、奇遇和顺遂，让主角光环闪耀。",
        Difficulty::Normal => "【模式设定】当前为常规模式（真实人生）。请保持现实主义的基调，有苦有甜，平淡中见真章。",
        Difficulty::Hard => "【模式设定】当前为困难模式（步步惊心）。请让生活充满挑战，挫折频繁，成功来之不易。",
        Difficulty::Hell => "【模式设定】当前为地狱模式（绝望求生）。请极尽残酷，每一次希望都伴随着更大的绝望，生存是唯一目标。",
    }
}

/// Strictness instruction for outcome judgments.
#[must_use]
pub fn judgment_difficulty(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "【模式设定】当前为爽文模式。判定标准宽松，容易获得成功，甚至意外之喜。",
        Difficulty::Normal => "【模式设定】当前为常规模式。判定标准基于概率和逻辑，公平公正。",
        Difficulty::Hard => "【模式设定】当前为困难模式。判定标准极其严苛，非大成功即为失败。",
        Difficulty::Hell => "【模式设定】当前为地狱模式。判定标准近乎绝望，除非掷出极高值，否则一律判定为灾难。",
    }
}

// ---------------------------------------------------------------------------
// Layered builder
// ---------------------------------------------------------------------------

/// Five-layer prompt under construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayeredPrompt {
    role: String,
    world: String,
    profile: String,
    task: String,
    constraints: Vec<String>,
}

impl LayeredPrompt {
    /// Start with a persona.
    #[must_use]
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            ..Self::default()
        }
    }

    /// World-context layer.
    #[must_use]
    pub fn world(mut self, world: impl Into<String>) -> Self {
        self.world = world.into();
        self
    }

    /// User-profile layer.
    #[must_use]
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Task layer.
    #[must_use]
    pub fn task(mut self, task: impl Into<String>) -> Self {
        self.task = task.into();
        self
    }

    /// Append a constraint block. Blocks are joined by newlines.
    #[must_use]
    pub fn constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraints.push(constraint.into());
        self
    }

    /// Render the final prompt text.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (title, body) in [
            ("Role", self.role.as_str()),
            ("World Context", self.world.as_str()),
            ("User Profile", self.profile.as_str()),
        ] {
            if !body.is_empty() {
                out.push_str(&format!("### {title} ###\n{body}\n\n"));
            }
        }
        out.push_str(&format!("### Task ###\n{}\n\n", self.task));
        out.push_str(&format!("### Constraints ###\n{}", self.constraints.join("\n")));
        out
    }
}

/// Simple template interpolation for prompts.
///
/// Replaces `{key}` with the corresponding value.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    result
}
