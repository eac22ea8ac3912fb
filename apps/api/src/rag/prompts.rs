/// Instruction template for document question answering.
/// Placeholders: {question}, {context}
pub const ANSWER_PROMPT_TEMPLATE: &str = "\
You are an assistant for question-answering tasks. \
Use the following pieces of retrieved context to answer the question. \
If you don't know the answer, just say that you don't know. \
Use three sentences maximum and keep the answer concise.
Question: {question}
Context: {context}
Answer:";

/// Separator placed between retrieved chunks when building the context.
pub const CONTEXT_SEPARATOR: &str = "\n\n";
