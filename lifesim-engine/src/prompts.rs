//! Prompt composition for every oracle call a turn makes.
//!
//! Each function assembles a [`LayeredPrompt`] from the profile state and the
//! step's inputs. None of them touch the network.

use lifesim_core::destiny::DestinyClass;
use lifesim_core::npc::Npc;
use lifesim_core::types::Profile;
use lifesim_llm::prompt::{
    self, judgment_difficulty, narrative_difficulty, render_template, LayeredPrompt,
    GUARDRAIL_CHINESE_ONLY, GUARDRAIL_JSON_ARRAY, GUARDRAIL_JSON_OBJECT,
};

const UNKNOWN: &str = "未知";

const SCENARIO_FIELDS: &str = "请必须返回 JSON 格式，包含三个字段：\n\
1. event (String): {event}\n\
2. status_change (String): {status}\n\
3. relationship_change (String): {relationship}";

const MEMORY_TASK: &str = "任务：把【新的经历】合并进【已有记忆】，输出一段新的人生记忆。\n\
要求：\n\
1. 只保留对命运有长期影响的事件，例如结婚、失业、丧亲、重大成就。\n\
2. 删去日常琐事和重复的细节。\n\
3. 第三人称叙述，按时间顺序。\n\
4. 总长度控制在 {limit} 字以内。\n\n\
【已有记忆】\n{memory}\n\n【新的经历】\n{event}";

fn or_unknown(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or(UNKNOWN)
}

/// The user-profile layer shared by most prompts.
#[must_use]
pub fn user_context(profile: &Profile) -> String {
    let info = &profile.basic_info;
    let family = &profile.family_background;

    let traits = if profile.personality_traits.is_empty() {
        "{}".to_string()
    } else {
        profile
            .personality_traits
            .iter()
            .map(|(name, score)| format!("{name}={score}"))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let values = if profile.core_values.is_empty() {
        "[]".to_string()
    } else {
        profile.core_values.join("、")
    };

    let mut context = format!(
        "- 游戏模式：{:?}\n\
         - 基本信息：姓名 {}, 年龄 {}, 学历 {}, 职业 {}, 坐标 {}\n\
         - 人生经历（重要）：{}\n\
         - 经济状况：存款 {:.0}, 负债 {:.0}\n\
         - 身体状态：精力值 {}%\n\
         - 家庭背景：父母状况: {}, 家庭资产: {}, 父亲职业: {}, 母亲职业: {}\n\
         - 核心特质：{}\n\
         - 核心价值观：{}",
        profile.difficulty,
        info.name,
        profile.current_age,
        or_unknown(info.education_level.as_deref()),
        or_unknown(info.profession.as_deref()),
        or_unknown(info.location.as_deref()),
        info.life_experiences.as_deref().filter(|e| !e.is_empty()).unwrap_or("无"),
        profile.economic_status.savings,
        profile.economic_status.debt,
        profile.health_status.energy_level,
        or_unknown(family.parents_status.as_deref()),
        or_unknown(family.family_assets.as_deref()),
        or_unknown(family.father_profession.as_deref()),
        or_unknown(family.mother_profession.as_deref()),
        traits,
        values,
    );

    if !profile.long_term_memory.is_empty() {
        context.push_str("\n- 人生记忆：");
        context.push_str(&profile.long_term_memory);
    }
    context
}

fn scenario_fields(event: &str, status: &str, relationship: &str) -> String {
    render_template(
        SCENARIO_FIELDS,
        &[("event", event), ("status", status), ("relationship", relationship)],
    )
}

/// Opening narrative for a freshly started profile.
#[must_use]
pub fn opening(profile: &Profile) -> String {
    LayeredPrompt::new(prompt::PERSONA_NARRATOR)
        .profile(user_context(profile))
        .task(format!(
            "任务：为该角色生成一段简短的开场旁白。重点描述其出身背景带来的阶级底色，以及那一点点不甘心的火苗。\n{}",
            scenario_fields("开场叙事。", "此刻的身心状态。", "与身边人的关系。")
        ))
        .constraint(GUARDRAIL_CHINESE_ONLY)
        .constraint(GUARDRAIL_JSON_OBJECT)
        .render()
}

/// Three forced-choice probe questions.
#[must_use]
pub fn probes(profile: &Profile) -> String {
    LayeredPrompt::new(prompt::PERSONA_PSYCHOLOGIST)
        .profile(user_context(profile))
        .task(
            "任务：根据用户画像，生成3个直击灵魂的二选一问题。\n\
             要求：\n\
             1. 问题必须多样化，涵盖职业选择与野心、道德伦理困境、亲密关系的处理、自我价值的实现。\n\
             2. 尽量避免只问家庭背景，要挖掘更深层的心理动机。\n\
             3. 结合用户填写的人生经历进行个性化提问。",
        )
        .constraint(GUARDRAIL_CHINESE_ONLY)
        .constraint(GUARDRAIL_JSON_ARRAY)
        .render()
}

/// Personality analysis of probe answers.
#[must_use]
pub fn probe_analysis(profile: &Profile, answers: &[(String, String)]) -> String {
    let mut answered = String::from("\n\n【用户回答】\n");
    for (question, answer) in answers {
        answered.push_str(&format!("问题：{question}\n回答：{answer}\n"));
    }

    LayeredPrompt::new(prompt::PERSONA_PSYCHOLOGIST)
        .world("用户刚刚完成了灵魂拷问。")
        .profile(user_context(profile) + &answered)
        .task(
            "任务：分析用户的回答，提取其核心人格特质（Openness, Conscientiousness, Extraversion, \
             Agreeableness, Neuroticism, Resilience, Ambition）和核心价值观。\n为每个特质打分（0-100）。",
        )
        .constraint(GUARDRAIL_JSON_OBJECT)
        .constraint(
            "返回格式示例：{\"personalityTraits\": {\"Resilience\": 80, \"Ambition\": 90}, \"coreValues\": [\"自由\", \"金钱\"]}",
        )
        .render()
}

/// One-sentence macro event for a calendar year.
#[must_use]
pub fn macro_event(year: i32) -> String {
    LayeredPrompt::new(prompt::PERSONA_HISTORIAN)
        .world(format!("当前年份：{year}"))
        .task("任务：推演这一年的全球宏观大事件（黑天鹅或灰犀牛）。关注经济周期、技术突变或地缘政治。一句话概括。")
        .constraint(GUARDRAIL_CHINESE_ONLY)
        .render()
}

/// Outcome judgment for the submitted choice.
#[must_use]
pub fn destiny_check(profile: &Profile, action: &str, macro_event: &str, roll: f64) -> String {
    LayeredPrompt::new(prompt::PERSONA_JUDGE)
        .world(format!("宏观事件：{macro_event}\n随机判定值(0-1)：{roll:.4}"))
        .profile(user_context(profile))
        .task(format!(
            "用户试图采取行动：{action}\n{}\n任务：基于用户能力值、宏观环境和随机值，判定行动结果（成功/失败/大成功/大失败）。\n请给出简短的判定理由。",
            judgment_difficulty(profile.difficulty)
        ))
        .constraint(GUARDRAIL_CHINESE_ONLY)
        .render()
}

/// Situation update for one NPC.
#[must_use]
pub fn npc_evolution(npc: &Npc, profile: &Profile, max_chars: usize) -> String {
    LayeredPrompt::new(prompt::PERSONA_NPC_ENGINE)
        .world(format!("玩家当前处境：{}", profile.current_scenario.event))
        .profile(format!(
            "NPC资料：姓名={}, 关系={:?}, 年龄={}, 状态={:?}, 亲密度={}, 近况={}",
            npc.name, npc.relation, npc.age, npc.status, npc.intimacy, npc.current_situation
        ))
        .task("任务：推演该NPC本年度的生活变故或与玩家的互动。")
        .constraint(GUARDRAIL_CHINESE_ONLY)
        .constraint(format!("限制：{max_chars}字以内。"))
        .render()
}

/// Inputs to the yearly narrative beyond the profile itself.
#[derive(Debug, Clone, Copy)]
pub struct YearInputs<'a> {
    /// Calendar year being narrated.
    pub year: i32,
    /// Macro event of that year.
    pub macro_event: &'a str,
    /// Rolled destiny class.
    pub destiny: DestinyClass,
    /// Judge's verdict on the choice.
    pub outcome: &'a str,
    /// The player's choice.
    pub choice: &'a str,
}

/// The yearly turn narrative.
#[must_use]
pub fn yearly(profile: &Profile, inputs: &YearInputs<'_>) -> String {
    LayeredPrompt::new(prompt::PERSONA_NARRATOR)
        .world(format!(
            "【世界层】\n年份：{}\n宏观事件：{}\n【判定层】\n命运类型：{}\n判定结果：{}\n用户抉择：{}",
            inputs.year, inputs.macro_event, inputs.destiny, inputs.outcome, inputs.choice
        ))
        .profile(user_context(profile))
        .task(format!(
            "任务：生成本年度的人生结案陈词。\n{}\n{}",
            narrative_difficulty(profile.difficulty),
            scenario_fields(
                "关键事件的叙事，充满画面感和孤独感。",
                "身体和精神状态的变化描述。",
                "人际关系的微妙变迁。",
            )
        ))
        .constraint(GUARDRAIL_CHINESE_ONLY)
        .constraint(GUARDRAIL_JSON_OBJECT)
        .render()
}

/// Montage covering a multi-year skip.
#[must_use]
pub fn skip_years(profile: &Profile, years: u32) -> String {
    LayeredPrompt::new(prompt::PERSONA_NARRATOR)
        .world(format!("时间跨度：过去的 {years} 年"))
        .profile(user_context(profile))
        .task(format!(
            "任务：快速蒙太奇。概括这几年的平淡生活。\n{}\n{}",
            narrative_difficulty(profile.difficulty),
            scenario_fields(
                "岁月流逝的整体叙事。",
                "身体状态的自然衰老。",
                "朋友的离散或家庭的羁绊。",
            )
        ))
        .constraint(GUARDRAIL_CHINESE_ONLY)
        .constraint(GUARDRAIL_JSON_OBJECT)
        .render()
}

/// Three next-step options.
#[must_use]
pub fn choices(profile: &Profile, context: &str) -> String {
    LayeredPrompt::new(prompt::PERSONA_GAME_DESIGNER)
        .world(format!("当前剧情：{context}"))
        .profile(user_context(profile))
        .task(
            "任务：基于当前处境，提供3个具体的下一步行动选项。\n要求：\n\
             1. 激进型（高风险高回报）\n2. 保守型（稳扎稳打）\n3. 情感/社交型（非功利性）",
        )
        .constraint(GUARDRAIL_CHINESE_ONLY)
        .constraint(GUARDRAIL_JSON_ARRAY)
        .render()
}

/// Merge of the latest narrative into long-term memory.
#[must_use]
pub fn memory_consolidation(profile: &Profile, new_event: &str, soft_limit_chars: usize) -> String {
    let memory = if profile.long_term_memory.is_empty() {
        "（空）"
    } else {
        profile.long_term_memory.as_str()
    };
    let limit = soft_limit_chars.to_string();

    LayeredPrompt::new(prompt::PERSONA_BIOGRAPHER)
        .task(render_template(
            MEMORY_TASK,
            &[("limit", &limit), ("memory", memory), ("event", new_event)],
        ))
        .constraint(GUARDRAIL_CHINESE_ONLY)
        .render()
}
