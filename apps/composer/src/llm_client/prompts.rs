// Prompt text for the "help me improve" action on long-text CV fields.

pub const IMPROVE_SYSTEM: &str = "You are an experienced career coach who edits CV text. \
    Respond with the rewritten text only. \
    Do NOT add headings, explanations, quotation marks or markdown code fences. \
    Do NOT invent employers, dates, numbers or achievements that are not in the original.";

pub const IMPROVE_PROMPT_TEMPLATE: &str = "\
    Act as a professional career coach. Review the following CV section for clarity, \
    impact, and professionalism. Rewrite it to be more compelling, keeping every fact \
    the author stated. Original text: {text}";

pub fn build_improve_prompt(text: &str) -> String {
    IMPROVE_PROMPT_TEMPLATE.replace("{text}", text.trim())
}
