use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_TIMER_MINUTES: u32 = 1;
pub const MAX_TIMER_MINUTES: u32 = 180;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Subject {
    English,
    Hindi,
    Science,
    Mathematics,
    #[serde(rename = "Social Science")]
    SocialScience,
    #[serde(rename = "AI")]
    Ai,
}

impl Subject {
    pub const ALL: [Subject; 6] = [
        Subject::English,
        Subject::Hindi,
        Subject::Science,
        Subject::Mathematics,
        Subject::SocialScience,
        Subject::Ai,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Hindi => "Hindi",
            Self::Science => "Science",
            Self::Mathematics => "Mathematics",
            Self::SocialScience => "Social Science",
            Self::Ai => "AI",
        }
    }

    /// Syllabus chapters offered when planning a task for this subject.
    pub fn chapters(self) -> &'static [&'static str] {
        match self {
            Self::Science => &[
                "Chemical Reactions and Equations",
                "Acids, Bases and Salts",
                "Metals and Non-metals",
                "Carbon and its Compounds",
                "Life Processes",
                "Control and Coordination",
                "How do Organisms Reproduce",
                "Heredity",
                "Light – Reflection and Refraction",
                "The Human Eye and the Colourful World",
                "Electricity",
                "Magnetic Effects of Electric Current",
                "Our Environment",
            ],
            Self::Mathematics => &[
                "Real Numbers",
                "Polynomials",
                "Pair of Linear Equations in Two Variables",
                "Quadratic Equations",
                "Arithmetic Progressions",
                "Triangles",
                "Coordinate Geometry",
                "Introduction to Trigonometry",
                "Some Applications of Trigonometry",
                "Circles",
                "Areas Related to Circles",
                "Surface Areas and Volumes",
                "Statistics",
                "Probability",
            ],
            Self::English => &[
                "F1 – Two Gentlemen of Verona",
                "F2 – Mrs Packeltide's Tiger",
                "F3 – The Letter",
                "F4 – A Shady Plot",
                "F5 – Patol Babu, Film Star",
                "F6 – Virtually True",
                "P1 – The Frog and the Nightingale",
                "P2 – Not Marble, Nor the Gilded Monuments",
                "P3 – Ozymandias",
                "P4 – The Rime of the Ancient Mariner",
                "P5 – Snake",
                "D1 – The Dear Departed",
                "D2 – Julius Caesar",
                "Gap Filling",
                "Omission",
                "Error Correction",
                "Reported Speech",
                "Jumbled Sentences",
                "Letter",
                "Article Writing",
                "Application",
                "Factual Description",
            ],
            Self::SocialScience => &[
                "The Rise of Nationalism in Europe",
                "Nationalism in India",
                "The Making of a Global World",
                "The Age of Industrialization",
                "Print Culture and the Modern World",
                "Resources and Development",
                "Forest and Wildlife Resources",
                "Water Resources",
                "Agriculture",
                "Minerals and Energy Resources",
                "Manufacturing Industries",
                "Lifelines of National Economy",
                "Power Sharing",
                "Federalism",
                "Gender, Religion and Caste",
                "Political Parties",
                "Outcomes of Democracy",
                "Development",
                "Sectors of the Indian Economy",
                "Money and Credit",
                "Globalisation and the Indian Economy",
                "Consumer Rights",
            ],
            Self::Ai => &[
                "Communication Skills",
                "Self-Management Skills",
                "Information and Communication Technology Skills",
                "Entrepreneurial Skills",
                "Green Skills",
                "Introduction to Artificial Intelligence",
                "AI Project Cycle",
                "Natural Language Processing",
                "Evaluating Models",
                "Data Sciences",
                "Computer Vision",
            ],
            Self::Hindi => &[],
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| format!("unknown subject: {value}"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum TaskType {
    #[default]
    Revision,
    #[serde(rename = "PYQs")]
    Pyqs,
    Notes,
    #[serde(rename = "Sample Paper")]
    SamplePaper,
    #[serde(rename = "Test Prep")]
    TestPrep,
    #[serde(rename = "Concept Building")]
    ConceptBuilding,
    #[serde(rename = "Theory Revision")]
    TheoryRevision,
    #[serde(rename = "Numerical Practice")]
    NumericalPractice,
    #[serde(rename = "Case Study Practice")]
    CaseStudyPractice,
    #[serde(rename = "Assertion Reason")]
    AssertionReason,
    #[serde(rename = "PYQ Intensive")]
    PyqIntensive,
    #[serde(rename = "Sample Paper Drill")]
    SamplePaperDrill,
    #[serde(rename = "Weak Area Fix")]
    WeakAreaFix,
    #[serde(rename = "Rapid Revision")]
    RapidRevision,
    #[serde(rename = "Exam Focus")]
    ExamFocus,
    #[serde(rename = "Full Syllabus Revision")]
    FullSyllabusRevision,
}

impl TaskType {
    pub const ALL: [TaskType; 16] = [
        TaskType::Revision,
        TaskType::Pyqs,
        TaskType::Notes,
        TaskType::SamplePaper,
        TaskType::TestPrep,
        TaskType::ConceptBuilding,
        TaskType::TheoryRevision,
        TaskType::NumericalPractice,
        TaskType::CaseStudyPractice,
        TaskType::AssertionReason,
        TaskType::PyqIntensive,
        TaskType::SamplePaperDrill,
        TaskType::WeakAreaFix,
        TaskType::RapidRevision,
        TaskType::ExamFocus,
        TaskType::FullSyllabusRevision,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Revision => "Revision",
            Self::Pyqs => "PYQs",
            Self::Notes => "Notes",
            Self::SamplePaper => "Sample Paper",
            Self::TestPrep => "Test Prep",
            Self::ConceptBuilding => "Concept Building",
            Self::TheoryRevision => "Theory Revision",
            Self::NumericalPractice => "Numerical Practice",
            Self::CaseStudyPractice => "Case Study Practice",
            Self::AssertionReason => "Assertion Reason",
            Self::PyqIntensive => "PYQ Intensive",
            Self::SamplePaperDrill => "Sample Paper Drill",
            Self::WeakAreaFix => "Weak Area Fix",
            Self::RapidRevision => "Rapid Revision",
            Self::ExamFocus => "Exam Focus",
            Self::FullSyllabusRevision => "Full Syllabus Revision",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| format!("unknown task type: {value}"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    #[default]
    High,
    Moderate,
    Low,
}

impl Priority {
    /// Sort rank; lower ranks are scheduled first.
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 1,
            Self::Moderate => 2,
            Self::Low => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Moderate => "Moderate",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "moderate" => Ok(Self::Moderate),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum TimerMode {
    #[default]
    Focus,
    ShortBreak,
    LongBreak,
}

impl TimerMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Focus => "focus",
            Self::ShortBreak => "shortBreak",
            Self::LongBreak => "longBreak",
        }
    }
}

impl FromStr for TimerMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "focus" => Ok(Self::Focus),
            "shortbreak" | "short_break" | "short-break" | "short" => Ok(Self::ShortBreak),
            "longbreak" | "long_break" | "long-break" | "long" => Ok(Self::LongBreak),
            other => Err(format!("unknown timer mode: {other}")),
        }
    }
}

/// One finished focus interval, logged against a task. Never mutated once recorded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PomodoroCompletion {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Minutes.
    pub duration: u32,
    pub mode: TimerMode,
}

impl PomodoroCompletion {
    pub fn validate(&self) -> Result<(), String> {
        if self.duration == 0 {
            return Err("pomodoroCompletion.duration must be > 0".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub subject: Subject,
    pub chapter: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub priority: Priority,
    pub reward: String,
    pub xp: String,
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub pomodoro_completions: Vec<PomodoroCompletion>,
}

impl Task {
    /// Parsed XP weight. Empty, unparseable, negative or non-finite values count as zero.
    pub fn xp_value(&self) -> f64 {
        self.xp
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value >= 0.0)
            .unwrap_or(0.0)
    }
}

/// User input for a new task before it receives an id.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub subject: Subject,
    pub chapter: String,
    pub task_type: TaskType,
    pub priority: Priority,
    pub reward: String,
    pub xp: String,
    pub notes: Option<String>,
}

impl TaskDraft {
    pub fn new(subject: Subject) -> Self {
        Self {
            subject,
            chapter: String::new(),
            task_type: TaskType::default(),
            priority: Priority::default(),
            reward: String::new(),
            xp: String::new(),
            notes: None,
        }
    }

    pub fn normalized(self) -> Self {
        Self {
            subject: self.subject,
            chapter: self.chapter.trim().to_string(),
            task_type: self.task_type,
            priority: self.priority,
            reward: self.reward.trim().to_string(),
            xp: self.xp.trim().to_string(),
            notes: self
                .notes
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToOwned::to_owned),
        }
    }

    pub fn into_task(self, id: String) -> Task {
        let draft = self.normalized();
        Task {
            id,
            subject: draft.subject,
            chapter: draft.chapter,
            task_type: draft.task_type,
            priority: draft.priority,
            reward: draft.reward,
            xp: draft.xp,
            done: false,
            notes: draft.notes,
            pomodoro_completions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudyDay {
    #[serde(with = "iso_instant")]
    pub date: DateTime<Utc>,
    pub tasks: Vec<Task>,
    pub collapsed: bool,
}

impl StudyDay {
    pub fn new(date: DateTime<Utc>) -> Self {
        Self {
            date,
            tasks: Vec::new(),
            collapsed: false,
        }
    }

    pub fn done_count(&self) -> usize {
        self.tasks.iter().filter(|task| task.done).count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroSettings {
    pub focus_duration: u32,
    pub short_break_duration: u32,
    pub long_break_duration: u32,
    pub current_mode: TimerMode,
    pub is_running: bool,
    pub remaining_seconds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_task_id: Option<String>,
}

impl Default for PomodoroSettings {
    fn default() -> Self {
        Self {
            focus_duration: 25,
            short_break_duration: 5,
            long_break_duration: 15,
            current_mode: TimerMode::Focus,
            is_running: false,
            remaining_seconds: 25 * 60,
            selected_task_id: None,
        }
    }
}

impl PomodoroSettings {
    /// Configured length of `mode` in minutes.
    pub fn duration_for(&self, mode: TimerMode) -> u32 {
        match mode {
            TimerMode::Focus => self.focus_duration,
            TimerMode::ShortBreak => self.short_break_duration,
            TimerMode::LongBreak => self.long_break_duration,
        }
    }
}

/// Field-wise partial update of [`PomodoroSettings`]. `selected_task_id: Some(None)` clears the selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PomodoroUpdate {
    pub focus_duration: Option<u32>,
    pub short_break_duration: Option<u32>,
    pub long_break_duration: Option<u32>,
    pub current_mode: Option<TimerMode>,
    pub is_running: Option<bool>,
    pub remaining_seconds: Option<u32>,
    pub selected_task_id: Option<Option<String>>,
}

impl PomodoroUpdate {
    pub fn apply_to(&self, current: &PomodoroSettings) -> PomodoroSettings {
        PomodoroSettings {
            focus_duration: self.focus_duration.unwrap_or(current.focus_duration),
            short_break_duration: self
                .short_break_duration
                .unwrap_or(current.short_break_duration),
            long_break_duration: self
                .long_break_duration
                .unwrap_or(current.long_break_duration),
            current_mode: self.current_mode.unwrap_or(current.current_mode),
            is_running: self.is_running.unwrap_or(current.is_running),
            remaining_seconds: self.remaining_seconds.unwrap_or(current.remaining_seconds),
            selected_task_id: self
                .selected_task_id
                .clone()
                .unwrap_or_else(|| current.selected_task_id.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundType {
    #[default]
    Default,
    Image,
    Url,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSettings {
    #[serde(default)]
    pub mode: ThemeMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<String>,
    #[serde(default)]
    pub background_type: BackgroundType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
}

impl ThemeSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.background_type != BackgroundType::Default {
            match self.background_image.as_deref() {
                Some(image) => validate_non_empty(image, "theme.backgroundImage")?,
                None => {
                    return Err(
                        "theme.backgroundImage is required for image and url backgrounds"
                            .to_string(),
                    );
                }
            }
        }
        Ok(())
    }
}

/// Field-wise partial update of [`ThemeSettings`]. Inner `None` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeUpdate {
    pub mode: Option<ThemeMode>,
    pub accent_color: Option<Option<String>>,
    pub background_type: Option<BackgroundType>,
    pub background_image: Option<Option<String>>,
}

impl ThemeUpdate {
    pub fn apply_to(&self, current: &ThemeSettings) -> ThemeSettings {
        ThemeSettings {
            mode: self.mode.unwrap_or(current.mode),
            accent_color: self
                .accent_color
                .clone()
                .unwrap_or_else(|| current.accent_color.clone()),
            background_type: self.background_type.unwrap_or(current.background_type),
            background_image: self
                .background_image
                .clone()
                .unwrap_or_else(|| current.background_image.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskerState {
    pub days: Vec<StudyDay>,
    pub pomodoro: PomodoroSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<ThemeSettings>,
    /// `YYYY-MM-DD` in India Standard Time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_visit_day: Option<String>,
    #[serde(default)]
    pub engagement_streak: u32,
}

impl Default for TaskerState {
    fn default() -> Self {
        Self {
            days: Vec::new(),
            pomodoro: PomodoroSettings::default(),
            theme: Some(ThemeSettings::default()),
            last_visit_day: None,
            engagement_streak: 0,
        }
    }
}

impl TaskerState {
    pub fn find_task(&self, task_id: &str) -> Option<&Task> {
        self.days
            .iter()
            .flat_map(|day| day.tasks.iter())
            .find(|task| task.id == task_id)
    }

    pub fn contains_task(&self, task_id: &str) -> bool {
        self.find_task(task_id).is_some()
    }
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

pub fn validate_timer_minutes(value: u32, field_name: &str) -> Result<(), String> {
    if !(MIN_TIMER_MINUTES..=MAX_TIMER_MINUTES).contains(&value) {
        return Err(format!(
            "{field_name} must be between {MIN_TIMER_MINUTES} and {MAX_TIMER_MINUTES} minutes"
        ));
    }
    Ok(())
}

/// Day instants are stored the way browsers print them: RFC 3339 with milliseconds and a `Z` suffix.
mod iso_instant {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(raw.trim())
            .map(|value| value.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
