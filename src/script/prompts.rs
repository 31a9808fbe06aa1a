//! Prompt templates for carousel script generation.

use crate::types::CarouselRequest;

/// The "Relatable VSL" method the model is instructed to follow. The
/// structured extractor enforces the output shape, so the prompt only has to
/// carry the methodology.
pub const VSL_METHODOLOGY: &str = r#"
**TikTok Carousel Ad Creation Tool**

**Objective:** Generate a complete TikTok carousel ad with both script captions and image prompts in one pass.

**Script Requirements:**
- 10 text segments total
- **Product mention only allowed in slide 9 and 10**
- **MUST include specific, relatable personal story elements**
- **Balance high relatability with psychological selling triggers**

**The "Relatable VSL" Method - slide structure:**
- **Slide 1:** Specific relatable struggle + curiosity element (e.g., "forgot my password 3 times in one day")
- **Slide 2:** Universal problem agitation with personal details
- **Slide 3:** Problem amplification + hidden truth ("what doctors don't tell you")
- **Slide 4:** Personal discovery moment + authority building (friend's recommendation, medical backing)
- **Slide 5:** Science/proof + credibility stacking (awards, medical use, specific research)
- **Slide 6:** Personal transformation with SPECIFIC timeline ("Day 3: X, Day 7: Y, Week 2: Z")
- **Slide 7:** Authentic social proof with family/friend stories ("my skeptical husband")
- **Slide 8:** Benefit stacking with personal results
- **Slide 9:** Product reveal + quality/authority positioning
- **Slide 10:** Urgency + emotional consequence with personal stakes

**MANDATORY personal story elements:**
- Specific, believable personal struggles (numbers, times, exact scenarios)
- Authentic transformation timeline with specific days/weeks
- Family/friend social proof that feels real and relatable
- First-person language that makes the audience think "that's exactly how I feel"
- Skeptical-to-believer conversion stories

**TikTok optimization:**
- Mobile-first writing with thumb-stopping personal hooks
- Conversational tone that feels like sharing with a friend
- Each slide builds curiosity for the next part of the story

**Image prompt structure (every slide):**
- Clear main visual concept, 30-40 words maximum
- Scene setting that supports the emotional tone of the caption
- Every prompt ends with: "ultra photorealistic, 16k, natural lighting, HDR, high resolution, shot on Canon EOS R5, Canon RF 50mm f/1.2L USM, depth of field, 9:16 vertical format"
- Consistent style descriptor across all 10 images
"#;

pub const VSL_EXAMPLES: &str = r#"
EXAMPLE VSL PATTERNS:

1. Natural Hair Regrowth Serum:
"My husband started losing his hair at 35. He tried everything, special shampoos, pills, even those expensive laser caps, but nothing worked. He was embarrassed to go out without a hat. Then, I stumbled on a centuries-old formula used by royalty in ancient India..."

2. Teeth Whitening Toothpaste:
"My best friend was always self-conscious about her teeth. Years of drinking coffee and red wine had left them stained yellow, and no matter how much she brushed, they never got whiter. Then, on a trip to Thailand, she discovered a secret..."

3. Detox Tea Blend:
"My cousin couldn't lose weight no matter how much she exercised. She felt bloated all the time and started losing confidence in herself. Then I found an article about a secret detox tea used by supermodels before fashion week..."

PATTERN ANALYSIS:
- Always start with a family member/friend struggle
- Include specific failed attempts ("tried everything")
- Discovery moment with authority/exotic origin
- Specific transformation timeline with days/weeks
- Product reveal with quality positioning
- Urgency with scarcity/selling out
"#;

pub const VSL_PRINCIPLES: &str = r#"
CORE PSYCHOLOGICAL PRINCIPLES:

1. CREDIBILITY STACKING: medical backing, historical use, awards, exclusivity
2. EMOTIONAL TRIGGERS: embarrassment, frustration, hope, transformation
3. CURIOSITY GAPS: "what doctors don't tell you", "secret used by [authority group]"
4. SOCIAL PROOF PATTERNS: skeptical conversion, family transformation, visible results
5. URGENCY/SCARCITY: limited availability, quality exclusivity, personal stakes
"#;

/// The system prompt handed to the extractor.
pub fn build_system_prompt() -> String {
    format!("{}\n{}\n{}", VSL_METHODOLOGY, VSL_EXAMPLES, VSL_PRINCIPLES)
}

/// The per-run task prompt built from the product brief.
pub fn build_task_prompt(request: &CarouselRequest) -> String {
    let mut prompt = String::from("**TASK:**\nCreate a complete TikTok carousel ad for:\n");
    prompt.push_str(&format!("- Product: {}\n", request.product));
    if !request.brand.is_empty() {
        prompt.push_str(&format!("- Brand: {}\n", request.brand));
    }
    if !request.category.is_empty() {
        prompt.push_str(&format!("- Category: {}\n", request.category));
    }
    if request.price > 0.0 {
        prompt.push_str(&format!("- Price: {} {:.2}\n", request.currency, request.price));
    }
    if !request.target_audience.is_empty() {
        prompt.push_str(&format!("- Target audience: {}\n", request.target_audience));
    }
    if !request.features.is_empty() {
        prompt.push_str(&format!("- Key features: {}\n", request.features.join(", ")));
    }

    prompt.push_str(
        "\n**REQUIREMENTS:**\n\
         1. Follow the exact \"Relatable VSL\" method structure\n\
         2. Use patterns from the example VSLs\n\
         3. Create exactly 10 slides, positions 1 through 10, with both caption and image prompt\n\
         4. Product mention ONLY in slides 9-10\n\
         5. Include a specific personal transformation timeline\n\
         6. Add authentic family/friend social proof\n\
         7. **CRITICAL:** Each image prompt must include the photorealistic camera specifications\n\
         8. **CRITICAL:** All images must be 9:16 vertical format\n\
         9. Keep image prompts to 30-40 words maximum\n\
         \nGenerate the complete carousel now.",
    );
    prompt
}
