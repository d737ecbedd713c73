//! Prompt construction for follow-up generation and report synthesis.

use super::cycle::FollowUp;
use crate::search::SearchResult;

/// Report-style instructions sent as the system message of every synthesis
/// call.
pub const SYSTEM_PROMPT: &str = r#"### Instruction Prompt for Comprehensive Research Report

---

### **Core Objective**
You are an advanced AI research assistant tasked with creating extensive, in-depth research reports. Your reports should be as comprehensive as necessary, potentially reaching 10,000+ words when the topic demands it. You will receive extensive web search results covering multiple aspects of the research topic. Your goal is to synthesize this information into a detailed, well-structured report with proper citations.

---

### **Report Structure**

1. **Quick Answer** (300-500 words)
   - Comprehensive yet concise summary of key findings
   - Essential context and background
   - Core conclusions with supporting evidence
   - Key implications and takeaways

2. **Executive Summary** (800-1000 words)
   - Comprehensive synthesis of all findings
   - Integration of key insights from all sections
   - Major trends and patterns identified
   - Critical analysis of the overall topic
   - Important implications and recommendations
   - Future outlook and considerations

3. **Key Questions and Analysis** (Minimum 500 words per question)
   - List of generated research questions
   - For each question:
     * In-depth exploration and analysis
     * Supporting evidence from multiple sources
     * Critical evaluation of findings
     * Real-world implications and examples
     * Connection to the main research topic
     * Future considerations and open questions

4. **Detailed Analysis** (No length limit - be as comprehensive as needed)
   - Analyze the topic based on the specific question asked
   - Create relevant sections that directly address different aspects of the question
   - Each section should include:
     * Thorough explanation of the topic (minimum 500 words per section)
     * Supporting evidence and data from sources
     * Real-world examples and applications
     * Critical analysis and insights
     * Implications and impact
     * Future considerations where relevant

5. **References**
   - Comprehensive source listing
   - All URLs as clickable links
   - Brief source descriptions

### **Writing Guidelines**

1. **Depth and Detail**
   - Provide extensive, thorough explanations for each topic
   - Minimum 500 words per section for proper depth
   - Include multiple perspectives and viewpoints
   - Connect concepts and show relationships
   - Explain complex ideas with clear examples

2. **Citations and Sources**
   - Use [SourceName] format for all citations
   - Multiple source citations for key claims
   - Cross-reference and validate information
   - Highlight consensus and disagreements
   - Integrate insights from various sources

3. **Quality Standards**
   - Academic-level analysis and rigor
   - Evidence-based arguments and conclusions
   - Comprehensive coverage of each aspect
   - Critical evaluation of information
   - Thorough fact-checking and verification

4. **Writing Style**
   - Clear, professional, and engaging tone
   - Logical flow and progression of ideas
   - In-depth technical explanations
   - Accessible yet sophisticated language
   - Strong narrative structure

---

Remember:
- Create sections that directly address the specific question
- Provide extensive, detailed explanations (500+ words per section)
- Support all claims with specific citations
- Include real-world examples and applications
- Focus on depth and thoroughness in every section
- Adapt the structure to best answer the specific question"#;

/// Page text when we have it, otherwise the search snippet.
fn source_text(result: &SearchResult) -> &str {
    if result.content.is_empty() {
        &result.snippet
    } else {
        &result.content
    }
}

fn numbered_sources(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "\nSource {} [{}]:\n{}\n---",
                i + 1,
                r.source_name,
                source_text(r)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt asking the model for `count` follow-up questions.
///
/// The first cycle asks about unexplored aspects of the primary results.
/// Later cycles embed the previous report verbatim and push toward deeper
/// questions.
pub fn follow_up_prompt(
    question: &str,
    primary: &[SearchResult],
    count: usize,
    cycle: u32,
    previous_report: &str,
) -> String {
    let mut prompt = if cycle <= 1 {
        format!(
            "\nBased on the following research results about \"{question}\", generate {count} \
             specific follow-up questions that would help create a comprehensive research report. \
             Focus on unexplored aspects and areas that need deeper investigation.\n\n\
             Research Results:\n{}",
            numbered_sources(primary)
        )
    } else {
        format!(
            "\nBased on the previous research report and results about \"{question}\", generate \
             {count} deeper, more specific follow-up questions for cycle {cycle}. Focus on:\n\
             1. Areas that need more detailed investigation\n\
             2. Complex aspects that weren't fully explored\n\
             3. Advanced concepts that deserve deeper analysis\n\
             4. Emerging trends and future implications\n\
             5. Interconnections between different aspects\n\n\
             Previous Report:\n{previous_report}\n\n\
             Additional Research Results:\n{}",
            numbered_sources(primary)
        )
    };

    prompt.push_str(&format!(
        "\nGenerate {count} specific, detailed follow-up questions that would provide valuable \
         additional insights for a comprehensive report. Each question should:\n\
         1. Focus on a different aspect of the topic\n\
         2. Address gaps in the current research\n\
         3. Explore potential future developments\n\
         4. Consider practical implications\n\
         5. Examine related areas and impacts\n\n\
         Format the response as a simple numbered list, 1-{count}, one question per line."
    ));
    prompt
}

fn cited_source(label: &str, result: &SearchResult) -> String {
    format!(
        "\nSource {label} [{}]:\nURL: {}\nContent:\n{}\n---",
        result.source_name,
        result.url,
        source_text(result)
    )
}

/// The user message of the synthesis call: every gathered source plus the
/// target report structure.
pub fn synthesis_prompt(
    question: &str,
    cycle: u32,
    previous_report: &str,
    primary: &[SearchResult],
    follow_ups: &[FollowUp],
) -> String {
    let previous = if cycle > 1 {
        format!("\nPrevious Research Cycle Results:\n{previous_report}\n")
    } else {
        String::new()
    };

    let primary_block = primary
        .iter()
        .enumerate()
        .map(|(i, r)| cited_source(&(i + 1).to_string(), r))
        .collect::<Vec<_>>()
        .join("\n");

    let follow_up_block = follow_ups
        .iter()
        .enumerate()
        .map(|(qi, fu)| {
            let sources = fu
                .results
                .iter()
                .enumerate()
                .map(|(ri, r)| cited_source(&format!("FQ{}-{}", qi + 1, ri + 1), r))
                .collect::<Vec<_>>()
                .join("\n");
            format!("\nFollow-up Question {}: {}\n{sources}\n", qi + 1, fu.question)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let question_list: String = follow_ups
        .iter()
        .enumerate()
        .map(|(i, fu)| format!("\n{}. {}", i + 1, fu.question))
        .collect();

    format!(
        "\nMain Research Question: {question}\n{previous}\n\n\
         Primary Research Results:\n{primary_block}\n\n\
         Additional Research Results:\n\n{follow_up_block}\n\n\
         Create a comprehensive research report following this structure:\n\n\
         1. Quick Answer (300-500 words): Provide a concise but comprehensive summary of the main findings.\n\n\
         2. Executive Summary (800-1000 words): Synthesize all findings, including insights from both main research and follow-up questions.\n\n\
         3. Key Questions and Analysis:\n\
         Here are the follow-up questions that were explored:\n{question_list}\n\n\
         For each question above, provide:\n\
         - Minimum 500 words of in-depth analysis\n\
         - Integration of findings from multiple sources\n\
         - Critical evaluation of the evidence\n\
         - Real-world implications and examples\n\
         - Connection to the main research question\n\
         - Future considerations and open areas for research\n\n\
         4. Detailed Analysis: Provide comprehensive analysis of all aspects of the main research question, \
         incorporating insights from both primary and follow-up research  (1500-10000 words).\n\n\
         Use [SourceName] format for citations and include all sources in the References section. \
         Be as thorough and detailed as the topic requires - there is no maximum length limit. \
         Include extensive analysis, examples, and case studies where relevant.\n"
    )
}
