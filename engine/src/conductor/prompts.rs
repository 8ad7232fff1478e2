//! Prompt templates
//!
//! Every text the engine sends to a language model is built here, so the
//! wording of the conversation lives in one place.

/// Instructions for the planner model. The user's question is appended by
/// [`render_dispatch`].
pub const DISPATCH_PROMPT: &str = r#"You are an intelligent dispatch agent for a conversational database system.
Your job is to analyze the user's question and decide which action to take:

1. Query the database (use the SQL agent) when the question requires information stored in the database.
2. Search the conversation memory (use the memory_search tool) when the question refers to previous interactions, prior results, or conversation context.
3. Respond directly when the question is general, a clarification, or something that requires neither DB data nor memory.

Examples:
- "Show the last 5 users" -> Query the database
- "What did you show me before?" -> Search memory
- "Can you explain more about those results?" -> Search memory
- "How does this system work?" -> Respond directly

Respond with a clear decision in the following JSON format:
{
  "reasoning": "Your step-by-step reasoning",
  "action": "database_query|memory_lookup|direct_response",
  "explanation": "Brief explanation of why you chose this action"
}
"#;

pub fn render_dispatch(question: &str) -> String {
    format!("{}\nUser question: {}\n", DISPATCH_PROMPT, question)
}

/// Memory synthesis prompt for `memory_lookup`
pub fn render_memory_search(memory_result: &str, question: &str) -> String {
    format!(
        "\nBased on the following information from the previous conversation:\n\n\
         {memory_result}\n\n\
         Respond to the user's question: \"{question}\"\n\n\
         If there isn't enough information in the memory, clearly indicate this.\n"
    )
}

/// Direct answer prompt for `direct_response`
pub fn render_direct_response(question: &str) -> String {
    format!(
        "\nYou are an assistant for SQL databases.\n\n\
         The user asks: \"{question}\"\n\n\
         Provide a direct response without querying any specific database or memory.\n\
         If the question really requires database data, indicate that you would need \
         to query the database to respond adequately.\n"
    )
}

/// Grounds the SQL agent in the real schema
pub fn render_db_schema(schema_text: &str) -> String {
    format!(
        "\nYou are an SQL agent that will answer user queries based only on the following schema.\n\n\
         DO NOT invent columns or tables. Only use what's listed here. If the information is missing, say so.\n\n\
         {schema_text}\n"
    )
}

/// Asks for a single query answering `question`
pub fn render_sql_generation(schema_text: &str, question: &str) -> String {
    format!(
        "{}\n\
         Write one SQLite SELECT query that answers the question below.\n\
         Reply with only the query inside a ```sql code block.\n\n\
         Question: {question}\n",
        render_db_schema(schema_text)
    )
}

/// Turns query results into a conversational answer
pub fn render_sql_answer(question: &str, sql: &str, rows: &str) -> String {
    format!(
        "The user asked: \"{question}\"\n\n\
         The query\n{sql}\nreturned:\n\n{rows}\n\n\
         Answer the question in plain language using only these results. \
         If the results are empty, say that no matching data was found.\n"
    )
}

/// Summary refresh prompt; `transcript` holds one `role: content` line per turn
pub fn render_summary(transcript: &str) -> String {
    format!(
        "Summarize the following conversation between a user and a database assistant.\n\
         Keep the questions asked, the tables and figures mentioned, and any conclusions.\n\
         Reply with the summary only.\n\n\
         {transcript}\n"
    )
}
