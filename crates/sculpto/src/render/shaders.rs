//! Built-in pipeline shader sources.
//!
//! The pipeline owns five shader programs, compiled once on first use from
//! the GLSL below. Binding points and texture slots match the constants in
//! [`crate::render::backend`].

use crate::render::backend::{ShaderStage, ShaderStageKind};

/// Source of one built-in shader program.
#[derive(Debug, Clone, Copy)]
pub struct ShaderSource {
    /// Program name for logs and backend diagnostics.
    pub name: &'static str,
    /// Vertex stage source.
    pub vertex: &'static str,
    /// Fragment stage source.
    pub fragment: &'static str,
}

impl ShaderSource {
    /// Stage list in backend order.
    #[must_use]
    pub fn stages(&self) -> [ShaderStage<'static>; 2] {
        [
            ShaderStage {
                kind: ShaderStageKind::Vertex,
                source: self.vertex,
            },
            ShaderStage {
                kind: ShaderStageKind::Fragment,
                source: self.fragment,
            },
        ]
    }
}

/// Depth-only pass filling the shadow caster's depth attachment.
pub const SHADOW_PASS: ShaderSource = ShaderSource {
    name: "shadow_pass",
    vertex: r"#version 450
layout(location = 0) in vec3 a_Position;

uniform mat4 u_MatrWVP;

void main()
{
    gl_Position = u_MatrWVP * vec4(a_Position, 1.0);
}
",
    fragment: r"#version 450
void main()
{
}
",
};

/// Deferred Phong lighting applied over the G-buffer.
pub const PHONG_LIGHTING: ShaderSource = ShaderSource {
    name: "phong_lighting",
    vertex: r"#version 450
layout(location = 0) in vec3 a_Position;
layout(location = 2) in vec2 a_TexCoords;

out vec2 v_TexCoords;

void main()
{
    v_TexCoords = a_TexCoords;
    gl_Position = vec4(a_Position, 1.0);
}
",
    fragment: r"#version 450
struct point_light { vec3 Position; float Constant; vec3 Color; float Linear; float Quadratic; };
struct directional_light { vec3 Direction; uint IsShadows; vec3 Color; mat4 ViewProjection; };
struct spot_light { vec3 Position; float InnerCutoffCos; vec3 Direction; float OuterCutoffCos; vec3 Color; float Epsilon; };

layout(std140, binding = 1) uniform ubo_LightsStorage
{
    point_light PointLights[50];
    directional_light DirectionalLight;
    spot_light SpotLights[50];
    uint PointLightsCount;
    uint IsDirectionalLight;
    uint SpotLightsCount;
};

uniform sampler2D u_GPosition;
uniform sampler2D u_GNormal;
uniform sampler2D u_GColor;
uniform sampler2D u_GDiffuse;
uniform sampler2D u_GSpecular;
uniform sampler2D u_GShininess;
uniform sampler2D u_ShadowMap;
uniform vec3 u_CameraPosition;
uniform vec3 u_Ambient;
uniform bool u_IsHDR;

in vec2 v_TexCoords;
layout(location = 0) out vec4 o_Color;
layout(location = 1) out vec4 o_Bright;

float ShadowFactor(vec3 position)
{
    if (DirectionalLight.IsShadows == 0u) return 0.0;
    vec4 light_space = DirectionalLight.ViewProjection * vec4(position, 1.0);
    vec3 coords = light_space.xyz / light_space.w * 0.5 + 0.5;
    if (coords.z > 1.0) return 0.0;
    float closest = texture(u_ShadowMap, coords.xy).r;
    return coords.z - 0.005 > closest ? 1.0 : 0.0;
}

vec3 Phong(vec3 light_dir, vec3 light_color, vec3 normal, vec3 view_dir,
           vec3 diffuse, vec3 specular, float shininess)
{
    float diff = max(dot(normal, light_dir), 0.0);
    vec3 reflected = reflect(-light_dir, normal);
    float spec = pow(max(dot(view_dir, reflected), 0.0), shininess);
    return light_color * (diff * diffuse + spec * specular);
}

void main()
{
    vec3 position = texture(u_GPosition, v_TexCoords).rgb;
    vec3 normal = normalize(texture(u_GNormal, v_TexCoords).rgb);
    vec3 color = texture(u_GColor, v_TexCoords).rgb;
    vec3 diffuse = texture(u_GDiffuse, v_TexCoords).rgb;
    vec3 specular = texture(u_GSpecular, v_TexCoords).rgb;
    float shininess = texture(u_GShininess, v_TexCoords).r;
    vec3 view_dir = normalize(u_CameraPosition - position);

    vec3 total = u_Ambient;
    for (uint i = 0u; i < PointLightsCount; ++i)
    {
        vec3 delta = PointLights[i].Position - position;
        float dist = length(delta);
        float attenuation = 1.0 / (PointLights[i].Constant
            + PointLights[i].Linear * dist
            + PointLights[i].Quadratic * dist * dist);
        total += attenuation * Phong(normalize(delta), PointLights[i].Color,
                                     normal, view_dir, diffuse, specular, shininess);
    }
    if (IsDirectionalLight != 0u)
    {
        vec3 light_dir = normalize(-DirectionalLight.Direction);
        vec3 lit = Phong(light_dir, DirectionalLight.Color, normal, view_dir,
                         diffuse, specular, shininess);
        total += (1.0 - ShadowFactor(position)) * lit;
    }
    for (uint i = 0u; i < SpotLightsCount; ++i)
    {
        vec3 light_dir = normalize(SpotLights[i].Position - position);
        float theta = dot(light_dir, normalize(-SpotLights[i].Direction));
        float intensity = clamp((theta - SpotLights[i].OuterCutoffCos) / SpotLights[i].Epsilon, 0.0, 1.0);
        total += intensity * Phong(light_dir, SpotLights[i].Color, normal, view_dir,
                                   diffuse, specular, shininess);
    }

    o_Color = vec4(total * color, 1.0);
    float brightness = dot(o_Color.rgb, vec3(0.2126, 0.7152, 0.0722));
    o_Bright = u_IsHDR && brightness > 1.0 ? o_Color : vec4(0.0, 0.0, 0.0, 1.0);
}
",
};

/// Single-axis gaussian blur for the bloom ping-pong.
pub const GAUSSIAN_BLUR: ShaderSource = ShaderSource {
    name: "gaussian_blur",
    vertex: r"#version 450
layout(location = 0) in vec3 a_Position;
layout(location = 2) in vec2 a_TexCoords;

out vec2 v_TexCoords;

void main()
{
    v_TexCoords = a_TexCoords;
    gl_Position = vec4(a_Position, 1.0);
}
",
    fragment: r"#version 450
uniform sampler2D u_Source;
uniform bool u_IsHorizontal;

in vec2 v_TexCoords;
layout(location = 0) out vec4 o_Color;

const float WEIGHTS[5] = float[](0.227027, 0.1945946, 0.1216216, 0.054054, 0.016216);

void main()
{
    vec2 texel = 1.0 / vec2(textureSize(u_Source, 0));
    vec3 result = texture(u_Source, v_TexCoords).rgb * WEIGHTS[0];
    for (int i = 1; i < 5; ++i)
    {
        vec2 offset = u_IsHorizontal ? vec2(texel.x * i, 0.0) : vec2(0.0, texel.y * i);
        result += texture(u_Source, v_TexCoords + offset).rgb * WEIGHTS[i];
        result += texture(u_Source, v_TexCoords - offset).rgb * WEIGHTS[i];
    }
    o_Color = vec4(result, 1.0);
}
",
};

/// Additive combine of two textures into the current target.
pub const TEXTURE_ADD: ShaderSource = ShaderSource {
    name: "texture_add",
    vertex: r"#version 450
layout(location = 0) in vec3 a_Position;
layout(location = 2) in vec2 a_TexCoords;

out vec2 v_TexCoords;

void main()
{
    v_TexCoords = a_TexCoords;
    gl_Position = vec4(a_Position, 1.0);
}
",
    fragment: r"#version 450
uniform sampler2D u_Source;
uniform sampler2D u_Blend;

in vec2 v_TexCoords;
layout(location = 0) out vec4 o_Color;

void main()
{
    o_Color = vec4(texture(u_Source, v_TexCoords).rgb + texture(u_Blend, v_TexCoords).rgb, 1.0);
}
",
};

/// Exposure tone mapping from the HDR buffer, with optional bloom blend.
pub const TONE_MAPPING: ShaderSource = ShaderSource {
    name: "tone_mapping",
    vertex: r"#version 450
layout(location = 0) in vec3 a_Position;
layout(location = 2) in vec2 a_TexCoords;

out vec2 v_TexCoords;

void main()
{
    v_TexCoords = a_TexCoords;
    gl_Position = vec4(a_Position, 1.0);
}
",
    fragment: r"#version 450
uniform sampler2D u_Source;
uniform sampler2D u_Blend;
uniform bool u_IsBloom;
uniform float u_Exposure;

in vec2 v_TexCoords;
layout(location = 0) out vec4 o_Color;

void main()
{
    vec3 hdr = texture(u_Source, v_TexCoords).rgb;
    if (u_IsBloom)
        hdr += texture(u_Blend, v_TexCoords).rgb;
    vec3 mapped = vec3(1.0) - exp(-hdr * u_Exposure);
    o_Color = vec4(pow(mapped, vec3(1.0 / 2.2)), 1.0);
}
",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_has_both_stages() {
        for source in [SHADOW_PASS, PHONG_LIGHTING, GAUSSIAN_BLUR, TEXTURE_ADD, TONE_MAPPING] {
            let stages = source.stages();
            assert_eq!(stages[0].kind, ShaderStageKind::Vertex);
            assert_eq!(stages[1].kind, ShaderStageKind::Fragment);
            assert!(!source.name.is_empty());
            assert!(stages.iter().all(|s| s.source.contains("void main()")));
        }
    }
}
