//! Prompt templates.
//!
//! Placeholders are `{name}` and are filled by [`render`]; other braces are
//! left untouched, so JSON examples can be written literally.

pub const PLANNER_PROMPT: &str = r#"You are a planner that plans a sequence of API calls to assist with user queries against an API.

You should:
1) evaluate whether the user query can be solved by the API documented below. If no, say why.
2) if yes, generate a plan of API calls and say what they are doing step by step.
3) if the plan includes a DELETE call, you should always return an ask from the User for authorization first unless the User has specifically asked to delete something.

You should only use API endpoints documented below ("Endpoints you can use:").
You can only use the DELETE tool if the User has specifically asked to delete something. Otherwise, you should return a request authorization from the User first.
Some user queries can be resolved in a single API call, but some will require several API calls.
Each step of the plan names exactly one endpoint as "METHOD /path", with concrete values substituted for path parameters when they are known.
The plan will be passed to an API controller that can format it into web requests and return the responses.

Endpoints you can use:
{endpoints}

User query: {query}

Respond with JSON only, in this shape:
{"steps": ["GET /some/path to do something", "POST /other/path to do something else"]}"#;

pub const REPLANNER_PROMPT: &str = r#"For the given objective, come up with a simple step by step plan. This plan should involve individual tasks, that if executed correctly will yield the correct answer. Do not add any superfluous steps. The result of the final step should be the final answer. Make sure that each step has all the information needed - do not skip steps.

Your objective was this:
{input}

Your original plan was this:
{plan}

You have currently done the follow steps:
{past_steps}

Update your plan accordingly. If no more steps are needed and you can return to the user, then respond with that. Otherwise, fill out the plan. Only add steps to the plan that still NEED to be done. Do not return previously done steps as part of the plan.

Respond with JSON only, either
{"action": {"response": "final answer for the user"}}
or
{"action": {"steps": ["remaining step", "..."]}}"#;

pub const API_CONTROLLER_PROMPT: &str = r#"You are an agent that gets a sequence of API calls and given their documentation, should execute them and return the final response.
If you cannot complete them and run into issues, you should explain the issue. If you're able to resolve an API call, you can retry the API call. When interacting with API objects, you should extract ids for inputs to other API calls but ids and names for outputs returned to the User.

Here is documentation on the API:
Base url: {api_url}
Endpoints:
{api_docs}

Here are tools to execute requests against the API: {tool_names}
{tool_descriptions}

Call the tools as needed. When the step is done, reply with the final answer for the step and no tool call."#;

pub const EXECUTE_STEP_PROMPT: &str = "For the following plan: {plan}\n\n\nYou are tasked with executing step 1, {task}.";

pub const PARSING_GET_PROMPT: &str = r#"Here is an API response:

{response}

====
Your task is to extract some information according to these instructions: {instructions}
When working with API objects, you should usually use ids over names.
If the response indicates an error, you should instead output a summary of the error.

Output:"#;

pub const PARSING_POST_PROMPT: &str = r#"Here is an API response:

{response}

====
Your task is to extract some information according to these instructions: {instructions}
When working with API objects, you should usually use ids over names. Do not return any ids or names that are not in the response.
If the response indicates an error, you should instead output a summary of the error.

Output:"#;

pub const PARSING_PATCH_PROMPT: &str = PARSING_POST_PROMPT;
pub const PARSING_PUT_PROMPT: &str = PARSING_POST_PROMPT;

pub const PARSING_DELETE_PROMPT: &str = r#"Here is an API response:

{response}

====
Your task is to extract some information according to these instructions: {instructions}
When working with API objects, you should usually use ids over names. Do not return any ids or names that are not in the response.
If the response indicates an error, you should instead output a summary of the error.

Output:"#;

pub const REQUESTS_GET_TOOL_DESCRIPTION: &str = r#"Use this to GET content from a website.
Input to the tool should be a json object with 3 keys: "url", "params" and "output_instructions".
The value of "url" should be a string.
The value of "params" should be a dict of the needed and available parameters from the OpenAPI spec related to the endpoint.
If parameters are not needed, or not available, leave it empty.
The value of "output_instructions" should be instructions on what information to extract from the response,
for example the id(s) for a resource(s) that the GET request fetches."#;

pub const REQUESTS_POST_TOOL_DESCRIPTION: &str = r#"Use this when you want to POST to a website.
Input to the tool should be a json object with 3 keys: "url", "data", and "output_instructions".
The value of "url" should be a string.
The value of "data" should be a dictionary of key-value pairs you want to POST to the url.
The value of "output_instructions" should be instructions on what information to extract from the response, for example the id(s) for a resource(s) that the POST request creates.
Always use double quotes for strings in the json string."#;

pub const REQUESTS_PATCH_TOOL_DESCRIPTION: &str = r#"Use this when you want to PATCH content on a website.
Input to the tool should be a json object with 3 keys: "url", "data", and "output_instructions".
The value of "url" should be a string.
The value of "data" should be a dictionary of key-value pairs of the body params available in the OpenAPI spec you want to PATCH the content with at the url.
The value of "output_instructions" should be instructions on what information to extract from the response, for example the id(s) for a resource(s) that the PATCH request creates.
Always use double quotes for strings in the json string."#;

pub const REQUESTS_PUT_TOOL_DESCRIPTION: &str = r#"Use this when you want to PUT to change content on a website.
Input to the tool should be a json object with 3 keys: "url", "data", and "output_instructions".
The value of "url" should be a string.
The value of "data" should be a dictionary of key-value pairs of the body params available in the OpenAPI spec you want to PUT the content with at the url.
The value of "output_instructions" should be instructions on what information to extract from the response, for example the id(s) for a resource(s) that the PUT request creates.
Always use double quotes for strings in the json string."#;

pub const REQUESTS_DELETE_TOOL_DESCRIPTION: &str = r#"ONLY USE THIS TOOL WHEN THE USER HAS SPECIFICALLY REQUESTED TO DELETE CONTENT FROM A WEBSITE.
Input to the tool should be a json object with 2 keys: "url", and "output_instructions".
The value of "url" should be a string.
The value of "output_instructions" should be instructions on what information to extract from the response, for example the id(s) for a resource(s) that the DELETE request creates.
Always use double quotes for strings in the json string.
ONLY USE THIS TOOL IF THE USER HAS SPECIFICALLY REQUESTED TO DELETE SOMETHING."#;

/// Fill `{key}` placeholders in one pass; substituted text is not rescanned.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let hit = vars
            .iter()
            .find(|(key, _)| after.starts_with(key) && after[key.len()..].starts_with('}'));
        match hit {
            Some((key, value)) => {
                out.push_str(value);
                rest = &after[key.len() + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
