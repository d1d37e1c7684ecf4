mod generate;
mod ideas;
mod probe;

pub use generate::{
    BookOutcome, GenerateCommands, GenerateIdeasArgs, GenerateScriptArgs, IdeaGenerationSummary,
    PlatformArg, ScriptOutput,
};
pub use ideas::{
    IdeaCommands, IdeaList, IdeaListArgs, IdeaRefArgs, IdeaStatusChange, StatusArg,
};
pub use probe::{ConnectionReport, TestCommands, TestGeminiArgs};

pub(crate) use generate::{generate_ideas, generate_script};
pub(crate) use ideas::{list_ideas, set_idea_status};
pub(crate) use probe::{test_gemini, test_openai};
