/*!

This is the long-form manual for `impact_scoring` and `ripplescore`.

## Scores

For every response, `ripplescore` computes:
* one score per sortable question (21 dimensions), from the statements the
  respondent placed in the "describes my project" bucket, in order. The
  statement at position `i` (starting at 0) contributes
  `weight * (1 - 0.05 * i)` and the sum is divided by `4.027`,
* five composite scores, each the sum of four dimension scores:

| composite                    | dimensions                                                        |
|------------------------------|-------------------------------------------------------------------|
| `context`                    | challenge_origin, diversity, trust, resources                     |
| `processes`                  | beneficence, reflection, decision_making, tool_construction       |
| `interventions_and_research` | duration, frequency, research_questions, design_facilitation      |
| `engaged_learners`           | reciprocity, civic_learning, critical_reflection, integration     |
| `outcomes`                   | goals_met, outputs_delivered, capacities_capabilities, sustainability |

  `voice` is reported on its own,
* the ripple-effect (propagation) score, computed on an influence network
  built from the head counts of the first, second and third degree.

## Input formats

The following formats are supported:
* `json` Survey responses as JSON documents
* `csv` One response per row, in Comma Separated Values
* `msforms` One response per row, in an Excel export (Microsoft Forms, Google Forms)
* `network_csv` An explicit influence network

### `json`

A single response object, or an array of them:

```json
{
  "projectId": "P-1",
  "responseId": "R-1",
  "connection": "Research Team",
  "alignment": { "goals": 0.8, "values": 0.7 },
  "rankings": {
    "duration": ["Multiple Years (1)", "A Year or Less (0.95)"]
  },
  "firstDegree": { "faculty": 2, "students": 3 },
  "secondDegree": { "faculty": 1 },
  "thirdDegree": {},
  "secondDegreeLikelihood": { "withinGroup": 0.5, "outsideGroup": 0.2 },
  "selectedScores": ["Project Impact Scores", "Ripple Effect Scores"]
}
```

Missing alignment ratings default to 0.5, missing likelihoods to 0.5, missing
counts to 0. `alignmentScore` overrides the mean of the alignment ratings.

The category keys are `faculty`, `staff`, `student_assistants`, `students`,
`core_community_members` and `community_institution`. The singular names
(`student`, `student-assistant`, `core-community-member`,
`community-institution-representative`) are accepted too.

### `csv`

The first row is a header. The recognized columns are:
* `response_id`, `project_id`, `project_name`, `connection`
* one column per dimension key (`duration`, `goals_met`, ...) with the ranked
  statements separated by `;`
* `first_degree.<category>`, `second_degree.<category>`, `third_degree.<category>`
* `second_degree.within_group`, `second_degree.outside_group`,
  `third_degree.within_group`, `third_degree.outside_group`
* `alignment.<rating>` and `alignment_score`
* `selected_scores`, with the section titles separated by `;`

Other columns are ignored. Empty cells take the default value. When the
response id is missing, it is replaced by `<file name>-<row number>`.

### `msforms`

The same columns as `csv`, in an Excel (.xlsx) file. When the workbook has
several worksheets, the name of the worksheet must be given with
`excelWorksheetName` or `--excel-worksheet-name`. Date cells (such as the
"Start time" column of Microsoft Forms) and boolean cells are accepted; they
only matter when they sit in one of the columns above.

### `network_csv`

A table with the columns `from`, `to` and `layer_number`, one row per edge.
The network is scored as is, without any ranking.

## Configuration

```json
{
  "outputSettings": { "projectName": "Pilot", "outputDirectory": "out" },
  "responseSources": [
    { "provider": "csv", "filePath": "responses.csv", "alignmentScore": 0.75 }
  ],
  "rules": { "normalizationConstant": 4.027, "positionDecay": 0.05 },
  "store": { "filePath": "scores.jsonl" }
}
```

All the `rules` are optional. Paths are relative to the configuration file.

## Output

The summary is a JSON document with the configuration and one entry per
response. Scores are written as strings with 4 decimals. Only the sections
the respondent selected are written; when none was selected, all of them are.

*/
