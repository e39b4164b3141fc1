//! Fixed instruction sent to the annotation oracle with every image.

/// Instruction describing the annotation JSON the oracle must return.
pub const ANNOTATION_INSTRUCTION: &str = r#"Analyze the given image and extract key information as structured JSON data. Ensure that:
The "keywords" array contains unique keywords or descriptive phrases (Bag of Words) that best represent the content of the image.
Each item in the array should be a string.
Exclude words or phrases that do not clearly fit the context.
All words should be written in lowercase.
Focus on nouns, adjectives, and key phrases that accurately describe the main elements and context of the image.
Properly distinguish between singular and plural forms of objects.
If applicable, the "instances" object should differentiate between single, few, and many instances of objects, with each entry in the following format:
"single": ["object1", "object2", ...]
"few": ["object1", "object2", ...]
"many": ["object1", "object2", ...]
Additionally, extract and clearly label contextual information in the "context" object, with entries for:
"time": "morning", "afternoon", "evening", "night" (or similar)
"location": "forest", "beach", "city street", etc.
"object": "car", "building", "river", etc.
"action": "running", "jumping", "sitting", etc. (if applicable)
If any contextual element is unclear or cannot be inferred, clearly label it as "unknown" in the "context" object.
The output should be a valid JSON object like the example below:

{
  "keywords": ["sky", "tree", "grass", "few clouds", "many rocks"],
  "instances": {
    "single": ["tree"],
    "few": ["clouds"],
    "many": ["rocks"]
  },
  "context": {
    "time": "evening",
    "location": "forest",
    "object": "campfire",
    "action": "burning"
  }
}"#;
